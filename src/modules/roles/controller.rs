use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use lectern_core::AppError;
use lectern_models::{
    AssignUserRolesDto, CreateRoleDto, PaginatedRolesResponse, Permission,
    PermissionCatalogResponse, RoleFilterParams, RoleId, RoleWithPermissions, SyncPermissionsDto,
    UpdateRoleDto, UserId, UserRolesResponse,
};

use crate::middleware::auth::{
    RequirePermissionList, RequirePermissionSync, RequireRoleAssign, RequireRoleCreate,
    RequireRoleDelete, RequireRoleList, RequireRoleUpdate, RequireRoleView,
};
use crate::modules::auth::controller::ValidationErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service;

// ============ Role Endpoints ============

#[utoipa::path(
    post,
    path = "/api/roles",
    request_body = CreateRoleDto,
    responses(
        (status = 201, description = "Role created successfully", body = RoleWithPermissions),
        (status = 400, description = "Invalid request or unknown permission id"),
        (status = 422, description = "Validation error", body = ValidationErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Role key already exists")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn create_role(
    State(state): State<AppState>,
    _auth: RequireRoleCreate,
    ValidatedJson(dto): ValidatedJson<CreateRoleDto>,
) -> Result<(StatusCode, Json<RoleWithPermissions>), AppError> {
    let role = service::create_role(state.role_store.as_ref(), dto).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    get,
    path = "/api/roles",
    params(
        ("search" = Option<String>, Query, description = "Match on role name or key"),
        ("limit" = Option<i64>, Query, description = "Items per page"),
        ("offset" = Option<i64>, Query, description = "Items to skip"),
        ("page" = Option<i64>, Query, description = "Page number")
    ),
    responses(
        (status = 200, description = "List of roles", body = PaginatedRolesResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn get_roles(
    State(state): State<AppState>,
    _auth: RequireRoleList,
    Query(params): Query<RoleFilterParams>,
) -> Result<Json<PaginatedRolesResponse>, AppError> {
    let result = service::list_roles(state.role_store.as_ref(), params).await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/roles/{id}",
    params(("id" = RoleId, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role with its permissions", body = RoleWithPermissions),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn get_role(
    State(state): State<AppState>,
    _auth: RequireRoleView,
    Path(id): Path<RoleId>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    let role = service::get_role(state.role_store.as_ref(), id).await?;
    Ok(Json(role))
}

#[utoipa::path(
    put,
    path = "/api/roles/{id}",
    params(("id" = RoleId, Path, description = "Role ID")),
    request_body = UpdateRoleDto,
    responses(
        (status = 200, description = "Role updated", body = RoleWithPermissions),
        (status = 400, description = "Invalid request or unknown permission id"),
        (status = 422, description = "Validation error", body = ValidationErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn update_role(
    State(state): State<AppState>,
    _auth: RequireRoleUpdate,
    Path(id): Path<RoleId>,
    ValidatedJson(dto): ValidatedJson<UpdateRoleDto>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    let role = service::update_role(state.role_store.as_ref(), id, dto).await?;
    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/api/roles/{id}",
    params(("id" = RoleId, Path, description = "Role ID")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn delete_role(
    State(state): State<AppState>,
    _auth: RequireRoleDelete,
    Path(id): Path<RoleId>,
) -> Result<StatusCode, AppError> {
    service::delete_role(state.role_store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/roles/{id}/permissions",
    params(("id" = RoleId, Path, description = "Role ID")),
    request_body = SyncPermissionsDto,
    responses(
        (status = 200, description = "Permission set replaced", body = RoleWithPermissions),
        (status = 400, description = "Unknown permission id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn sync_role_permissions(
    State(state): State<AppState>,
    _auth: RequirePermissionSync,
    Path(id): Path<RoleId>,
    Json(dto): Json<SyncPermissionsDto>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    let role = service::sync_role_permissions(state.role_store.as_ref(), id, dto).await?;
    Ok(Json(role))
}

// ============ Permission Endpoints ============

#[utoipa::path(
    get,
    path = "/api/permissions",
    responses(
        (status = 200, description = "Stored permissions", body = Vec<Permission>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Permissions",
    security(("bearer_auth" = []))
)]
pub async fn get_permissions(
    State(state): State<AppState>,
    _auth: RequirePermissionList,
) -> Result<Json<Vec<Permission>>, AppError> {
    let permissions = service::list_permissions(state.role_store.as_ref()).await?;
    Ok(Json(permissions))
}

#[utoipa::path(
    get,
    path = "/api/permissions/catalog",
    responses(
        (status = 200, description = "Permission catalog grouped by module", body = PermissionCatalogResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Permissions",
    security(("bearer_auth" = []))
)]
pub async fn get_catalog(
    State(state): State<AppState>,
    _auth: RequirePermissionList,
) -> Json<PermissionCatalogResponse> {
    Json(service::catalog(state.gate.catalog()))
}

// ============ User Role Endpoints ============

#[utoipa::path(
    get,
    path = "/api/users/{id}/roles",
    params(("id" = UserId, Path, description = "User ID")),
    responses(
        (status = 200, description = "Roles held by the user", body = UserRolesResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn get_user_roles(
    State(state): State<AppState>,
    _auth: RequireRoleView,
    Path(id): Path<UserId>,
) -> Result<Json<UserRolesResponse>, AppError> {
    let roles = service::get_user_roles(state.role_store.as_ref(), id).await?;
    Ok(Json(roles))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}/roles",
    params(("id" = UserId, Path, description = "User ID")),
    request_body = AssignUserRolesDto,
    responses(
        (status = 200, description = "Role set replaced", body = UserRolesResponse),
        (status = 400, description = "Unknown role id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn assign_user_roles(
    State(state): State<AppState>,
    _auth: RequireRoleAssign,
    Path(id): Path<UserId>,
    Json(dto): Json<AssignUserRolesDto>,
) -> Result<Json<UserRolesResponse>, AppError> {
    let roles = service::assign_user_roles(state.role_store.as_ref(), id, dto).await?;
    Ok(Json(roles))
}
