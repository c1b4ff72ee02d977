//! Role and permission models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use lectern_core::{PaginationMeta, PaginationParams, PermissionAction, PermissionKey, PermissionModule};

use crate::ids::{PermissionId, RoleId, UserId};

/// Derives a machine-stable role key from a display name.
///
/// Lowercases, turns anything that is not `[a-z0-9]` into `_`, collapses runs
/// of `_` and trims them from both ends.
pub fn role_key_from_name(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            key.push(c);
        } else if !key.is_empty() && !key.ends_with('_') {
            key.push('_');
        }
    }
    key.trim_end_matches('_').to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Permission {
    pub id: PermissionId,
    pub permission_name: String,
    pub permission_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Role {
    pub id: RoleId,
    pub role_name: String,
    pub role_key: String,
    pub role_description: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

// DTOs

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRoleDto {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Role name must be between 1 and 100 characters"
    ))]
    pub role_name: String,
    /// Derived from `role_name` when omitted
    #[validate(length(min = 1, max = 100, message = "Role key must be between 1 and 100 characters"))]
    pub role_key: Option<String>,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub role_description: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub permission_ids: Vec<PermissionId>,
}

/// Update of a role. `permission_ids`, when present, replaces the whole set.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleDto {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Role name must be between 1 and 100 characters"
    ))]
    pub role_name: Option<String>,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub role_description: Option<String>,
    pub is_default: Option<bool>,
    pub permission_ids: Option<Vec<PermissionId>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SyncPermissionsDto {
    pub permission_ids: Vec<PermissionId>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AssignUserRolesDto {
    pub role_ids: Vec<RoleId>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RoleFilterParams {
    /// Case-insensitive match on role name or key
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedRolesResponse {
    pub data: Vec<RoleWithPermissions>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserRolesResponse {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogEntry {
    pub key: PermissionKey,
    pub name: String,
    pub action: PermissionAction,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogModule {
    pub module: PermissionModule,
    pub permissions: Vec<CatalogEntry>,
}

/// The permission catalog grouped by module, in catalog order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PermissionCatalogResponse {
    pub modules: Vec<CatalogModule>,
}
