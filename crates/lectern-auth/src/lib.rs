//! # Lectern Auth
//!
//! Guards, token claims and JWT utilities for the Lectern API.
//!
//! This crate provides:
//!
//! - [`claims`]: [`Guard`], [`PrincipalKind`] and the access token [`Claims`]
//! - [`jwt`]: Token creation and per-guard verification
//!
//! # Guards
//!
//! Two guards validate bearer tokens:
//!
//! - **Admin guard**: tokens minted for platform admins, audience `JWT_ADMIN_AUDIENCE`
//! - **User guard**: tokens for generic users and for institute/faculty logins
//!   (which are tied to their shadow user row), audience `JWT_USER_AUDIENCE`
//!
//! A token only ever validates against the guard it was minted for.
//!
//! # Example
//!
//! ```ignore
//! use lectern_auth::{Guard, PrincipalKind, create_access_token, verify_token};
//! use lectern_config::JwtConfig;
//!
//! let config = JwtConfig::from_env();
//!
//! let token = create_access_token(Guard::Admin, admin_id, "root@lectern.dev", PrincipalKind::Admin, &config)?;
//! let claims = verify_token(&token, Guard::Admin, &config)?;
//! assert!(verify_token(&token, Guard::User, &config).is_err());
//! ```

pub mod claims;
pub mod jwt;

// Re-export commonly used types at crate root
pub use claims::{Claims, Guard, PrincipalKind};
pub use jwt::{create_access_token, verify_token};
