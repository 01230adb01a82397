/// Refresh Token Management
///
/// Refresh tokens are:
/// - 32 random bytes from the OS generator, hex encoded (64 characters)
/// - Hashed with SHA-256 before storage (never store plaintext)
/// - Valid for 60 days, never extended or rotated
/// - Revoked by stamping `revoked_at`; records are never deleted

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::auth::principal::Principal;

/// Fixed lifetime of every refresh token.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 60;

const TOKEN_BYTES: usize = 32;

/// Generation attempts before a store gives up on finding an unused value.
pub const MAX_CREATE_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("refresh token not found")]
    NotFound,
    #[error("refresh token value already exists")]
    Duplicate,
    #[error("random source failed: {0}")]
    Entropy(String),
    #[error("storage backend failed: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::Duplicate
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// A freshly created refresh token, including the plaintext value the
/// client keeps. Only its hash is persisted.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub token: String,
    pub principal: Principal,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    fn issue(principal: Principal) -> Result<Self, StoreError> {
        let created_at = Utc::now();
        Ok(Self {
            token: generate_refresh_token()?,
            principal,
            created_at,
            expires_at: created_at + Duration::days(REFRESH_TOKEN_TTL_DAYS),
            revoked_at: None,
        })
    }
}

/// What a store knows about a presented refresh token
///
/// Expiry and revocation are reported, not enforced; the caller decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenLookup {
    pub principal: Principal,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenLookup {
    /// Active means not revoked and `now < expires_at`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }
}

/// Persistence contract for refresh tokens
///
/// `create` and `revoke` must each be atomic for a single record. Token
/// values are unique for the lifetime of the store.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Generate, persist and return a new token for `principal`
    async fn create(&self, principal: Principal) -> Result<RefreshToken, StoreError>;

    /// Find the owner and validity window of a token
    ///
    /// # Errors
    /// `NotFound` if no record matches
    async fn lookup_principal(&self, token: &str) -> Result<RefreshTokenLookup, StoreError>;

    /// Stamp `revoked_at` if not already set
    ///
    /// # Errors
    /// `NotFound` if no record matches
    async fn revoke(&self, token: &str) -> Result<(), StoreError>;
}

/// Generate a new cryptographically secure refresh token
///
/// 256 bits from the OS generator, hex encoded. This is the value handed to
/// the client; the server stores only its SHA-256 hash.
pub fn generate_refresh_token() -> Result<String, StoreError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| StoreError::Entropy(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Hash a refresh token using SHA-256
///
/// Never store plaintext tokens.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Build a token record for `principal`, retrying `persist` with a fresh
/// value whenever it reports a duplicate
pub(crate) async fn create_with_retry<F, Fut>(
    principal: Principal,
    mut persist: F,
) -> Result<RefreshToken, StoreError>
where
    F: FnMut(RefreshToken) -> Fut,
    Fut: std::future::Future<Output = Result<RefreshToken, StoreError>>,
{
    for attempt in 1..=MAX_CREATE_ATTEMPTS {
        let candidate = RefreshToken::issue(principal)?;
        match persist(candidate).await {
            Err(StoreError::Duplicate) => {
                tracing::warn!(attempt, "Refresh token collision, regenerating");
            }
            other => return other,
        }
    }
    Err(StoreError::Duplicate)
}
