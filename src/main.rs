use std::net::TcpListener;
use std::sync::Arc;

use chirpy::auth::{AccessTokenCodec, AuthSessionService, PasswordHasher};
use chirpy::configuration::get_configuration;
use chirpy::persistence::{PgAccountStore, PgRefreshTokenStore};
use chirpy::startup::{run, AppState};
use chirpy::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

fn startup_error(kind: std::io::ErrorKind, message: &str) -> std::io::Error {
    std::io::Error::new(kind, message.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

    let configuration = get_configuration().map_err(|e| {
        tracing::error!("Failed to read configuration: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let hasher = PasswordHasher::new(configuration.auth.password_hash_cost).map_err(|e| {
        tracing::error!("Invalid password hash cost: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;
    let codec = AccessTokenCodec::new(&configuration.auth.signing_secret);

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            startup_error(std::io::ErrorKind::ConnectionRefused, "Database connection error")
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        startup_error(std::io::ErrorKind::Other, "Migration error")
    })?;

    let accounts = Arc::new(PgAccountStore::new(pool.clone()));
    let refresh_tokens = Arc::new(PgRefreshTokenStore::new(pool));
    let sessions = AuthSessionService::new(accounts.clone(), refresh_tokens, hasher, codec)
        .map_err(|e| {
            tracing::error!("Failed to build session service: {}", e);
            startup_error(std::io::ErrorKind::Other, "Password hasher error")
        })?;

    let state = AppState {
        accounts,
        sessions: Arc::new(sessions),
        hasher,
    };

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, state)?.await
}
