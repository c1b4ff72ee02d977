//! # Lectern CLI
//!
//! Administrative tooling behind the `lectern-cli` binary: account creation,
//! permission catalog sync, default roles and demo data.
//!
//! Everything goes through the store traits so the same functions run against
//! Postgres in the binary and the in-memory store in tests.
//!
//! ```ignore
//! use lectern_cli::catalog::{seed_default_roles, sync_permissions};
//!
//! sync_permissions(&store).await?;
//! seed_default_roles(&store).await?;
//! ```

pub mod accounts;
pub mod catalog;
pub mod seeder;
