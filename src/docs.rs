use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use lectern_core::{PaginationMeta, PaginationParams, PermissionAction, PermissionKey, PermissionModule};
use lectern_models::{
    AssignUserRolesDto, CatalogEntry, CatalogModule, CreateFacultyDto, CreateInstituteDto,
    CreateRoleDto, Faculty, Guard, Institute, LinkRoleDto, LoginRequest, LoginResponse,
    MeResponse, PaginatedFacultiesResponse, PaginatedInstitutesResponse, PaginatedRolesResponse,
    Permission, PermissionCatalogResponse, PrincipalKind, PrincipalProfile, Role,
    RoleWithPermissions, SyncPermissionsDto, UpdateRoleDto, UserRolesResponse,
};

use crate::modules::auth::controller::{DenialResponse, ErrorResponse, ValidationErrorResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::me,
        crate::modules::roles::controller::create_role,
        crate::modules::roles::controller::get_roles,
        crate::modules::roles::controller::get_role,
        crate::modules::roles::controller::update_role,
        crate::modules::roles::controller::delete_role,
        crate::modules::roles::controller::sync_role_permissions,
        crate::modules::roles::controller::get_permissions,
        crate::modules::roles::controller::get_catalog,
        crate::modules::roles::controller::get_user_roles,
        crate::modules::roles::controller::assign_user_roles,
        crate::modules::institutes::controller::create_institute,
        crate::modules::institutes::controller::get_institutes,
        crate::modules::institutes::controller::get_institute,
        crate::modules::institutes::controller::link_institute_role,
        crate::modules::faculties::controller::create_faculty,
        crate::modules::faculties::controller::get_faculties,
        crate::modules::faculties::controller::get_faculty,
        crate::modules::faculties::controller::link_faculty_role,
    ),
    components(
        schemas(
            LoginRequest,
            LoginResponse,
            MeResponse,
            Guard,
            PrincipalKind,
            PrincipalProfile,
            ErrorResponse,
            ValidationErrorResponse,
            DenialResponse,
            PermissionKey,
            PermissionModule,
            PermissionAction,
            Permission,
            Role,
            RoleWithPermissions,
            CreateRoleDto,
            UpdateRoleDto,
            SyncPermissionsDto,
            AssignUserRolesDto,
            UserRolesResponse,
            PaginatedRolesResponse,
            CatalogEntry,
            CatalogModule,
            PermissionCatalogResponse,
            Institute,
            CreateInstituteDto,
            PaginatedInstitutesResponse,
            Faculty,
            CreateFacultyDto,
            PaginatedFacultiesResponse,
            LinkRoleDto,
            PaginationMeta,
            PaginationParams,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login for every principal kind and the current session"),
        (name = "Roles", description = "Roles, their permission sets and user role assignment"),
        (name = "Permissions", description = "Stored permissions and the compiled catalog"),
        (name = "Institutes", description = "Institute management"),
        (name = "Faculties", description = "Faculty management")
    ),
    info(
        title = "Lectern API",
        version = "0.1.0",
        description = "Authorization core of an education platform: permission catalog, role graph, gate and multi-table login.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
