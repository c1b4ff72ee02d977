//! Request extractors for authentication and permission checks.
//!
//! # Authentication Flow
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. [`auth::AuthPrincipal`] tries the admin guard, then the user guard, and
//!    loads the principal the accepted token names
//! 3. Permission extractors declared with `require_permissions!` ask the gate
//!    whether that principal holds every listed permission
//! 4. Handler executes if all checks pass
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::auth::{AuthPrincipal, RequireRoleCreate};
//!
//! // Any signed-in principal
//! async fn me(principal: AuthPrincipal) -> impl IntoResponse { /* ... */ }
//!
//! // Permission-gated
//! async fn create_role(RequireRoleCreate(principal): RequireRoleCreate) -> impl IntoResponse {
//!     // Only executes if the gate grants "role_create"
//! }
//! ```

pub mod auth;
