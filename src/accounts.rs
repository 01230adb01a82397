/// Account records
///
/// The account store is owned by the surrounding application; the session
/// service only needs to find an account by email and read its digest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::auth::Principal;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("email is already registered")]
    DuplicateEmail,
    #[error("account backend failed: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for AccountError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                AccountError::DuplicateEmail
            }
            _ => AccountError::Backend(err.to_string()),
        }
    }
}

/// Stored account, including the password digest
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Principal,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of an account that may leave the server
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AccountProfile {
    pub id: Principal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
}

impl From<&Account> for AccountProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            created_at: account.created_at,
            updated_at: account.updated_at,
            email: account.email.clone(),
        }
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError>;

    async fn find_by_id(&self, id: Principal) -> Result<Option<Account>, AccountError>;

    /// Persist a new account with an already hashed password
    ///
    /// # Errors
    /// `DuplicateEmail` if the email is taken
    async fn create(&self, email: &str, password_hash: &str) -> Result<Account, AccountError>;

    /// Replace the email and password digest of an existing account
    ///
    /// Returns `None` if no account has this id.
    ///
    /// # Errors
    /// `DuplicateEmail` if another account already uses `email`
    async fn update(
        &self,
        id: Principal,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<Account>, AccountError>;
}
