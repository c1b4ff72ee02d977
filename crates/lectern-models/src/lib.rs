//! # Lectern Models
//!
//! Domain models and DTOs for the Lectern API.
//!
//! # Modules
//!
//! - [`ids`]: Strongly-typed ids for every identity table and graph entity
//! - [`principals`]: The [`Principal`] sum type and its four variants
//! - [`roles`]: Roles, permissions and the admin tooling DTOs
//! - [`directory`]: Institute and faculty records
//! - [`auth`]: Login and profile DTOs
//!
//! # Example
//!
//! ```ignore
//! use lectern_models::{Principal, PrincipalKind};
//!
//! fn describe(principal: &Principal) -> String {
//!     format!("{} {}", principal.kind(), principal.email())
//! }
//! ```

pub mod auth;
pub mod directory;
pub mod ids;
pub mod principals;
pub mod roles;

// Re-export commonly used types at crate root for convenience
pub use auth::{Claims, Guard, LoginRequest, LoginResponse, MeResponse, PrincipalKind};

pub use directory::{
    CreateFacultyDto, CreateInstituteDto, Faculty, FacultyFilterParams, Institute,
    InstituteFilterParams, LinkRoleDto, PaginatedFacultiesResponse, PaginatedInstitutesResponse,
};

pub use ids::{AdminId, DepartmentId, FacultyId, InstituteId, PermissionId, RoleId, UserId};

pub use principals::{
    AdminPrincipal, AdminType, FacultyPrincipal, InstitutePrincipal, Principal, PrincipalProfile,
    UserPrincipal, UserType,
};

pub use roles::{
    AssignUserRolesDto, CatalogEntry, CatalogModule, CreateRoleDto, PaginatedRolesResponse,
    Permission, PermissionCatalogResponse, Role, RoleFilterParams, RoleWithPermissions,
    SyncPermissionsDto, UpdateRoleDto, UserRolesResponse, role_key_from_name,
};
