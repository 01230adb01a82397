/// Authentication Routes
///
/// Login, access token refresh, refresh token revocation and current user
/// information. Refresh and revoke read the refresh token from the
/// `Authorization: Bearer` header.

use actix_web::{http::header::AUTHORIZATION, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::accounts::{AccountProfile, AccountStore};
use crate::auth::{AuthSessionService, Principal};
use crate::error::AppError;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Requested access token lifetime; clamped to one hour
    pub expires_in_seconds: Option<i64>,
}

/// Account fields plus both tokens
#[derive(Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub account: AccountProfile,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

fn authorization_header(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
}

/// POST /api/login
///
/// # Errors
/// - 401: Unknown email or wrong password (indistinguishable)
/// - 500: Internal server error
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<AuthSessionService>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let outcome = sessions
        .login(&form.email, &form.password, form.expires_in_seconds)
        .await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        account: outcome.account,
        token: outcome.access_token,
        refresh_token: outcome.refresh_token,
    }))
}

/// POST /api/refresh
///
/// Mints a one hour access token. The refresh token itself is not rotated.
///
/// # Errors
/// - 401: Missing, unknown, expired or revoked refresh token
pub async fn refresh(
    req: HttpRequest,
    sessions: web::Data<AuthSessionService>,
) -> Result<HttpResponse, AppError> {
    let token = sessions.refresh(authorization_header(&req)).await?;

    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

/// POST /api/revoke
///
/// # Errors
/// - 401: Missing or unknown refresh token
pub async fn revoke(
    req: HttpRequest,
    sessions: web::Data<AuthSessionService>,
) -> Result<HttpResponse, AppError> {
    sessions.revoke(authorization_header(&req)).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/me
///
/// **Requires valid access token**; the principal is injected by `JwtMiddleware`.
///
/// # Errors
/// - 401: Token problems (handled by middleware) or the account no longer exists
pub async fn get_current_user(
    principal: web::ReqData<Principal>,
    accounts: web::Data<dyn AccountStore>,
) -> Result<HttpResponse, AppError> {
    let principal = principal.into_inner();
    let account = accounts
        .find_by_id(principal)
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id = %principal, "Access token for missing account");
            AppError::Unauthorized
        })?;

    Ok(HttpResponse::Ok().json(AccountProfile::from(&account)))
}
