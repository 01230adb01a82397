//! In-process stores backed by mutex-guarded maps.
//!
//! Every operation takes the lock once and finishes inside it, which gives
//! the single-record atomicity the store contracts ask for.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::accounts::{Account, AccountError, AccountStore};
use crate::auth::refresh_token::create_with_retry;
use crate::auth::{
    hash_token, Principal, RefreshToken, RefreshTokenLookup, RefreshTokenStore, StoreError,
};

#[derive(Debug, Clone)]
struct StoredRefreshToken {
    principal: Principal,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

/// Refresh tokens keyed by the SHA-256 hash of their value
#[derive(Debug, Default)]
pub struct InMemoryRefreshTokenStore {
    records: Mutex<HashMap<String, StoredRefreshToken>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records ever created; revoked records are kept
    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, StoredRefreshToken>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Backend("refresh token store lock poisoned".to_string()))
    }

    fn insert(&self, record: RefreshToken) -> Result<RefreshToken, StoreError> {
        let mut records = self.lock()?;
        match records.entry(hash_token(&record.token)) {
            Entry::Occupied(_) => Err(StoreError::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(StoredRefreshToken {
                    principal: record.principal,
                    created_at: record.created_at,
                    expires_at: record.expires_at,
                    revoked_at: record.revoked_at,
                });
                Ok(record)
            }
        }
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn create(&self, principal: Principal) -> Result<RefreshToken, StoreError> {
        create_with_retry(principal, |record| async move { self.insert(record) }).await
    }

    async fn lookup_principal(&self, token: &str) -> Result<RefreshTokenLookup, StoreError> {
        let records = self.lock()?;
        let stored = records.get(&hash_token(token)).ok_or(StoreError::NotFound)?;
        debug_assert!(stored.expires_at > stored.created_at);

        Ok(RefreshTokenLookup {
            principal: stored.principal,
            expires_at: stored.expires_at,
            revoked_at: stored.revoked_at,
        })
    }

    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        let mut records = self.lock()?;
        let stored = records
            .get_mut(&hash_token(token))
            .ok_or(StoreError::NotFound)?;

        // First revocation wins
        stored.revoked_at.get_or_insert_with(Utc::now);
        Ok(())
    }
}

/// Accounts keyed by id, with a case-sensitive email index
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: Mutex<HashMap<Principal, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Principal, Account>>, AccountError> {
        self.accounts
            .lock()
            .map_err(|_| AccountError::Backend("account store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        let accounts = self.lock()?;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Principal) -> Result<Option<Account>, AccountError> {
        let accounts = self.lock()?;
        Ok(accounts.get(&id).cloned())
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<Account, AccountError> {
        let mut accounts = self.lock()?;
        if accounts.values().any(|a| a.email == email) {
            return Err(AccountError::DuplicateEmail);
        }

        let now = Utc::now();
        let account = Account {
            id: Principal::new(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update(
        &self,
        id: Principal,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<Account>, AccountError> {
        let mut accounts = self.lock()?;
        if accounts.values().any(|a| a.email == email && a.id != id) {
            return Err(AccountError::DuplicateEmail);
        }

        let Some(account) = accounts.get_mut(&id) else {
            return Ok(None);
        };
        account.email = email.to_string();
        account.password_hash = password_hash.to_string();
        account.updated_at = Utc::now();
        Ok(Some(account.clone()))
    }
}
