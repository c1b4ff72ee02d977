//! # Lectern Core
//!
//! Core types, errors, and utilities for the Lectern API.
//!
//! This crate provides foundational types used throughout the workspace:
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`permissions`]: The closed permission catalog and its alias table
//! - [`pagination`]: Pagination utilities for list endpoints
//! - [`password`]: Password hashing and verification
//!
//! # Example
//!
//! ```ignore
//! use lectern_core::permissions::{PermissionCatalog, PermissionKey};
//!
//! let catalog = PermissionCatalog::standard()?;
//! assert_eq!(catalog.canonicalize("LECTURES:CREATE"), Some(PermissionKey::LectureCreate));
//! ```

pub mod errors;
pub mod pagination;
pub mod password;
pub mod permissions;

// Re-export commonly used types at crate root
pub use errors::AppError;
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
pub use permissions::{
    AliasConflict, Canonicalized, PermissionAction, PermissionAliases, PermissionCatalog, PermissionKey,
    PermissionModule,
};
