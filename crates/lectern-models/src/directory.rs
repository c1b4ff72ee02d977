//! Institute and faculty records.
//!
//! Both tables double as login identities: their rows carry a password hash
//! (never serialized) and at most one linked role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use lectern_core::{PaginationMeta, PaginationParams};

use crate::ids::{DepartmentId, FacultyId, InstituteId, RoleId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Institute {
    pub id: InstituteId,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub is_active: bool,
    pub role_id: Option<RoleId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Faculty {
    pub id: FacultyId,
    pub institute_id: InstituteId,
    pub department_id: Option<DepartmentId>,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub is_active: bool,
    pub role_id: Option<RoleId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateInstituteDto {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 5, max = 20, message = "Mobile must be between 5 and 20 characters"))]
    pub mobile: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role_id: Option<RoleId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFacultyDto {
    /// Required for admins. Institute principals always create under their own institute.
    pub institute_id: Option<InstituteId>,
    pub department_id: Option<DepartmentId>,
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 5, max = 20, message = "Mobile must be between 5 and 20 characters"))]
    pub mobile: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role_id: Option<RoleId>,
}

/// Links a role to an institute or faculty. `null` unlinks.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LinkRoleDto {
    pub role_id: Option<RoleId>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InstituteFilterParams {
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FacultyFilterParams {
    pub institute_id: Option<InstituteId>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedInstitutesResponse {
    pub data: Vec<Institute>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedFacultiesResponse {
    pub data: Vec<Faculty>,
    pub meta: PaginationMeta,
}
