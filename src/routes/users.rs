use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::accounts::{AccountProfile, AccountStore};
use crate::auth::{validate_password_policy, PasswordHasher, Principal};
use crate::error::AppError;
use crate::validators::is_valid_email;

/// Body of both `POST` and `PUT /api/users`
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
}

/// Validate the credentials and hash the password off the async executor
async fn prepare_credentials(
    request: CreateUserRequest,
    hasher: &PasswordHasher,
) -> Result<(String, String), AppError> {
    let CreateUserRequest { email, password } = request;

    let email = is_valid_email(&email)?;
    validate_password_policy(&password)?;

    let hasher = *hasher;
    let password_hash = web::block(move || hasher.hash(&password)).await??;

    Ok((email, password_hash))
}

/// POST /api/users
///
/// # Errors
/// - 400: Invalid email or password shorter than 8 characters / longer than 72 bytes
/// - 409: Email already registered
/// - 500: Internal server error
pub async fn create_user(
    form: web::Json<CreateUserRequest>,
    accounts: web::Data<dyn AccountStore>,
    hasher: web::Data<PasswordHasher>,
) -> Result<HttpResponse, AppError> {
    let (email, password_hash) = prepare_credentials(form.into_inner(), hasher.get_ref()).await?;

    let account = accounts.create(&email, &password_hash).await?;

    tracing::info!(user_id = %account.id, "User registered successfully");

    Ok(HttpResponse::Created().json(AccountProfile::from(&account)))
}

/// PUT /api/users
///
/// Replace the caller's email and password.
/// **Requires valid access token**; the principal is injected by `JwtMiddleware`.
/// Existing sessions are left alone.
///
/// # Errors
/// - 400: Invalid email or password
/// - 401: Token problems (handled by middleware) or the account no longer exists
/// - 409: Email belongs to another account
pub async fn update_user(
    principal: web::ReqData<Principal>,
    form: web::Json<CreateUserRequest>,
    accounts: web::Data<dyn AccountStore>,
    hasher: web::Data<PasswordHasher>,
) -> Result<HttpResponse, AppError> {
    let principal = principal.into_inner();
    let (email, password_hash) = prepare_credentials(form.into_inner(), hasher.get_ref()).await?;

    let account = accounts
        .update(principal, &email, &password_hash)
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id = %principal, "Access token for missing account");
            AppError::Unauthorized
        })?;

    tracing::info!(user_id = %account.id, "User credentials updated");

    Ok(HttpResponse::Ok().json(AccountProfile::from(&account)))
}
