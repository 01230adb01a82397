/// Persistence module
///
/// Store implementations for accounts and refresh tokens: an in-memory pair
/// for tests and local runs, and a PostgreSQL pair for deployments.

mod memory;
mod postgres;

pub use memory::{InMemoryAccountStore, InMemoryRefreshTokenStore};
pub use postgres::{PgAccountStore, PgRefreshTokenStore};
