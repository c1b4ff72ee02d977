//! # Lectern Config
//!
//! Configuration types for the Lectern API.
//!
//! This crate provides configuration structures loaded from environment variables:
//!
//! - [`jwt`]: JWT signing, expiry and per-guard audiences
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`rate_limit`]: Login throttling configuration
//! - [`authz`]: Authorization gate settings (store timeout)
//!
//! # Example
//!
//! ```ignore
//! use lectern_config::{AuthzConfig, CorsConfig, JwtConfig, RateLimitConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let cors_config = CorsConfig::from_env();
//! let rate_limit_config = RateLimitConfig::from_env();
//! let authz_config = AuthzConfig::from_env();
//! ```

pub mod authz;
pub mod cors;
pub mod jwt;
pub mod rate_limit;

// Re-export commonly used types at crate root
pub use authz::AuthzConfig;
pub use cors::CorsConfig;
pub use jwt::JwtConfig;
pub use rate_limit::RateLimitConfig;
