/// Login sessions
///
/// A session is a refresh token plus the access tokens minted from it.
/// Each refresh token is Active until it expires or is revoked; both of
/// those are terminal, and neither is reported to the caller as anything
/// other than `Unauthorized`.

use std::sync::Arc;

use actix_web::web;
use chrono::{Duration, Utc};
use thiserror::Error;

use crate::accounts::{AccountProfile, AccountStore};
use crate::auth::bearer::extract_bearer_token;
use crate::auth::jwt::{clamp_ttl, AccessTokenCodec, DEFAULT_ACCESS_TOKEN_TTL_SECONDS};
use crate::auth::password::{PasswordError, PasswordHasher};
use crate::auth::principal::Principal;
use crate::auth::refresh_token::{RefreshTokenStore, StoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    /// Unknown email or wrong password; deliberately not told apart
    #[error("invalid email or password")]
    InvalidCredentials,
    /// Any failure to present a usable token
    #[error("unauthorized")]
    Unauthorized,
    #[error("internal error: {0}")]
    Internal(String),
}

/// Tokens and public account fields returned by a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub account: AccountProfile,
    pub access_token: String,
    pub refresh_token: String,
}

/// Secret behind the digest checked when no account matches a login email
const UNKNOWN_ACCOUNT_SECRET: &str = "chirpy-unknown-account";

pub struct AuthSessionService {
    accounts: Arc<dyn AccountStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    hasher: PasswordHasher,
    codec: AccessTokenCodec,
    /// Digest at the configured cost, so unknown emails cost as much as real ones
    unknown_account_digest: String,
}

impl AuthSessionService {
    /// # Errors
    /// Returns error if the placeholder digest cannot be computed
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        hasher: PasswordHasher,
        codec: AccessTokenCodec,
    ) -> Result<Self, PasswordError> {
        let unknown_account_digest = hasher.hash(UNKNOWN_ACCOUNT_SECRET)?;

        Ok(Self {
            accounts,
            refresh_tokens,
            hasher,
            codec,
            unknown_account_digest,
        })
    }

    /// Run bcrypt on the blocking pool
    async fn check_password(
        &self,
        password: &str,
        digest: &str,
    ) -> Result<Result<(), PasswordError>, SessionError> {
        let hasher = self.hasher;
        let secret = password.to_string();
        let digest = digest.to_string();

        web::block(move || hasher.verify(&secret, &digest))
            .await
            .map_err(|e| SessionError::Internal(format!("password check aborted: {}", e)))
    }

    /// Verify credentials and open a session
    ///
    /// `requested_ttl_seconds` is clamped to 1..=3600, defaulting to an hour.
    ///
    /// # Errors
    /// - `InvalidCredentials` for an unknown email or a wrong password
    /// - `Internal` for store, hashing or signing failures
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        requested_ttl_seconds: Option<i64>,
    ) -> Result<LoginOutcome, SessionError> {
        let account = self
            .accounts
            .find_by_email(email)
            .await
            .map_err(|e| SessionError::Internal(e.to_string()))?;

        let Some(account) = account else {
            // Same bcrypt work as a real account; the outcome is ignored
            let _ = self
                .check_password(password, &self.unknown_account_digest)
                .await?;
            tracing::warn!("Login attempt for unknown email");
            return Err(SessionError::InvalidCredentials);
        };

        match self.check_password(password, &account.password_hash).await? {
            Ok(()) => {}
            Err(PasswordError::CredentialMismatch) => {
                tracing::warn!(user_id = %account.id, "Login attempt with wrong password");
                return Err(SessionError::InvalidCredentials);
            }
            Err(e) => {
                return Err(SessionError::Internal(format!(
                    "password check for {} failed: {}",
                    account.id, e
                )))
            }
        }

        let access_token = self
            .codec
            .issue(account.id, clamp_ttl(requested_ttl_seconds))
            .map_err(|e| SessionError::Internal(e.to_string()))?;
        let refresh_token = self
            .refresh_tokens
            .create(account.id)
            .await
            .map_err(|e| SessionError::Internal(e.to_string()))?;

        tracing::info!(user_id = %account.id, "User logged in successfully");

        Ok(LoginOutcome {
            account: AccountProfile::from(&account),
            access_token,
            refresh_token: refresh_token.token,
        })
    }

    /// Exchange a refresh token for a new one-hour access token
    ///
    /// The refresh token is neither rotated nor extended.
    ///
    /// # Errors
    /// - `Unauthorized` for a bad header or an unknown, expired or revoked token
    /// - `Internal` for store or signing failures
    pub async fn refresh(&self, authorization: Option<&str>) -> Result<String, SessionError> {
        let token = extract_bearer(authorization)?;

        let lookup = self
            .refresh_tokens
            .lookup_principal(token)
            .await
            .map_err(|e| store_error("refresh", e))?;

        if lookup.revoked_at.is_some() {
            tracing::warn!(user_id = %lookup.principal, "Attempt to use revoked refresh token");
            return Err(SessionError::Unauthorized);
        }

        if !lookup.is_active_at(Utc::now()) {
            tracing::info!(user_id = %lookup.principal, "Refresh token expired");
            return Err(SessionError::Unauthorized);
        }

        let access_token = self
            .codec
            .issue(lookup.principal, Duration::seconds(DEFAULT_ACCESS_TOKEN_TTL_SECONDS))
            .map_err(|e| SessionError::Internal(e.to_string()))?;

        tracing::info!(user_id = %lookup.principal, "Access token refreshed");
        Ok(access_token)
    }

    /// Revoke the presented refresh token
    ///
    /// Revoking an already revoked token succeeds.
    ///
    /// # Errors
    /// - `Unauthorized` for a bad header or an unknown token
    /// - `Internal` for store failures
    pub async fn revoke(&self, authorization: Option<&str>) -> Result<(), SessionError> {
        let token = extract_bearer(authorization)?;

        let lookup = self
            .refresh_tokens
            .lookup_principal(token)
            .await
            .map_err(|e| store_error("revoke", e))?;

        self.refresh_tokens
            .revoke(token)
            .await
            .map_err(|e| store_error("revoke", e))?;

        tracing::info!(user_id = %lookup.principal, "Refresh token revoked");
        Ok(())
    }

    /// Check an `Authorization` header carrying an access token
    ///
    /// # Errors
    /// `Unauthorized` for any header or token problem
    pub fn validate_access_token(&self, authorization: Option<&str>) -> Result<Principal, SessionError> {
        let token = extract_bearer(authorization)?;

        self.codec.verify(token).map_err(|e| {
            tracing::warn!(error = %e, "Access token rejected");
            SessionError::Unauthorized
        })
    }
}

fn extract_bearer(authorization: Option<&str>) -> Result<&str, SessionError> {
    extract_bearer_token(authorization).map_err(|e| {
        tracing::warn!(error = %e, "Bearer token extraction failed");
        SessionError::Unauthorized
    })
}

fn store_error(operation: &str, err: StoreError) -> SessionError {
    match err {
        StoreError::NotFound => {
            tracing::warn!(operation, "Refresh token not found");
            SessionError::Unauthorized
        }
        other => SessionError::Internal(format!("{} failed: {}", operation, other)),
    }
}
