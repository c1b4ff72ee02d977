//! Authentication request and response DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use lectern_core::PermissionKey;

use crate::principals::PrincipalProfile;

pub use lectern_auth::{Claims, Guard, PrincipalKind};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    #[schema(example = "password123")]
    pub password: String,
}

/// Successful login.
///
/// `kind` names the identity table that accepted the credentials; `guard` is
/// the guard the token must be presented to.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub guard: Guard,
    pub kind: PrincipalKind,
    pub profile: PrincipalProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub guard: Guard,
    pub profile: PrincipalProfile,
    pub permissions: Vec<PermissionKey>,
    pub is_system_bypass: bool,
}
