//! Store tests against a real Postgres
//!
//! Each test creates its own database from `configuration/`. Run with
//! `cargo test -- --ignored` once Postgres is up.

use chirpy::accounts::{AccountError, AccountStore};
use chirpy::auth::{hash_token, Principal, RefreshTokenStore, StoreError};
use chirpy::configuration::{get_configuration, DatabaseSettings};
use chirpy::persistence::{PgAccountStore, PgRefreshTokenStore};
use chrono::Utc;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

async fn test_pool() -> PgPool {
    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = Uuid::new_v4().to_string();
    configure_database(&configuration.database).await
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn refresh_token_lifecycle() {
    let pool = test_pool().await;
    let accounts = PgAccountStore::new(pool.clone());
    let store = PgRefreshTokenStore::new(pool.clone());
    let account = accounts
        .create("walt@breakingbad.com", "$2b$04$digest")
        .await
        .expect("create account");

    let created = store.create(account.id).await.expect("create token");
    let found = store.lookup_principal(&created.token).await.expect("lookup");
    assert_eq!(found.principal, account.id);
    assert!(found.revoked_at.is_none());

    // Only the hash is stored
    let stored_plaintext: Option<(String,)> =
        sqlx::query_as("SELECT token_hash FROM refresh_tokens WHERE token_hash = $1")
            .bind(&created.token)
            .fetch_optional(&pool)
            .await
            .expect("query");
    assert!(stored_plaintext.is_none());

    store.revoke(&created.token).await.expect("first revoke");
    let first = store
        .lookup_principal(&created.token)
        .await
        .expect("lookup")
        .revoked_at
        .expect("revoked");

    store.revoke(&created.token).await.expect("second revoke");
    let second = store
        .lookup_principal(&created.token)
        .await
        .expect("lookup")
        .revoked_at;
    assert_eq!(second, Some(first));
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn unknown_refresh_token_is_not_found() {
    let pool = test_pool().await;
    let store = PgRefreshTokenStore::new(pool);

    assert!(matches!(
        store.lookup_principal("deadbeef").await,
        Err(StoreError::NotFound)
    ));
    assert!(matches!(store.revoke("deadbeef").await, Err(StoreError::NotFound)));
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn duplicate_token_hash_maps_to_duplicate() {
    let pool = test_pool().await;
    let accounts = PgAccountStore::new(pool.clone());
    let account = accounts
        .create("walt@breakingbad.com", "$2b$04$digest")
        .await
        .expect("create account");

    let insert = |id: Uuid| {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, token_hash, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(hash_token("same-value"))
        .bind(account.id.as_uuid())
        .bind(now)
        .bind(now + chrono::Duration::days(60))
    };

    insert(Uuid::new_v4()).execute(&pool).await.expect("first insert");
    let err = insert(Uuid::new_v4())
        .execute(&pool)
        .await
        .expect_err("unique token_hash");
    assert!(matches!(StoreError::from(err), StoreError::Duplicate));
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn account_store_roundtrip() {
    let pool = test_pool().await;
    let store = PgAccountStore::new(pool);

    let walt = store
        .create("walt@breakingbad.com", "$2b$04$old")
        .await
        .expect("create");
    store
        .create("jesse@breakingbad.com", "$2b$04$other")
        .await
        .expect("create");

    assert!(matches!(
        store.create("walt@breakingbad.com", "$2b$04$x").await,
        Err(AccountError::DuplicateEmail)
    ));

    let by_email = store
        .find_by_email("walt@breakingbad.com")
        .await
        .expect("query")
        .expect("found");
    assert_eq!(by_email.id, walt.id);

    let updated = store
        .update(walt.id, "heisenberg@breakingbad.com", "$2b$04$new")
        .await
        .expect("update")
        .expect("account exists");
    assert_eq!(updated.email, "heisenberg@breakingbad.com");
    assert_eq!(updated.password_hash, "$2b$04$new");

    assert!(matches!(
        store.update(walt.id, "jesse@breakingbad.com", "$2b$04$x").await,
        Err(AccountError::DuplicateEmail)
    ));
    assert!(store
        .update(Principal::new(), "saul@example.com", "$2b$04$x")
        .await
        .expect("update")
        .is_none());
}
