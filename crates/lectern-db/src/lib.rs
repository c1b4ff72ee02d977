//! # Lectern DB
//!
//! Database pool, migrations and the stores behind the authorization core.
//!
//! The store traits ([`IdentityStore`], [`CredentialStore`], [`RoleStore`],
//! [`DirectoryStore`]) are implemented by [`PgStore`] for PostgreSQL and, with
//! the `test-utils` feature, by an in-memory `MemoryStore`.
//!
//! # Example
//!
//! ```ignore
//! use lectern_db::{init_db_pool, run_migrations, PgStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sqlx::Error> {
//!     let pool = init_db_pool().await?;
//!     run_migrations(&pool).await?;
//!     let store = PgStore::new(pool);
//!     Ok(())
//! }
//! ```

use std::env;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub mod error;
#[cfg(feature = "test-utils")]
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::StoreError;
#[cfg(feature = "test-utils")]
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{
    AccountStore, AdminCredentials, CredentialStore, DirectoryStore, FacultyCredentials,
    IdentityStore, InstituteCredentials, NewAdmin, NewFaculty, NewInstitute, NewPermission,
    NewRole, NewUser, RoleChanges, RoleStore, ShadowUser, UserCredentials,
};

// Re-export PgPool for convenience
pub use sqlx::PgPool;

/// Initializes a PostgreSQL connection pool from `DATABASE_URL`.
///
/// `DATABASE_MAX_CONNECTIONS` caps the pool size (default 10).
///
/// # Errors
///
/// Returns [`sqlx::Error::Configuration`] when `DATABASE_URL` is unset, and the
/// connection error when the database cannot be reached.
pub async fn init_db_pool() -> Result<PgPool, sqlx::Error> {
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| sqlx::Error::Configuration("DATABASE_URL must be set".into()))?;

    let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(10);

    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await
}

/// Applies the embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
