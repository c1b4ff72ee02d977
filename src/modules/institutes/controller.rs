use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use lectern_core::AppError;
use lectern_models::{
    CreateInstituteDto, Institute, InstituteFilterParams, InstituteId, LinkRoleDto,
    PaginatedInstitutesResponse,
};

use crate::middleware::auth::{
    RequireInstituteCreate, RequireInstituteList, RequireInstituteUpdate, RequireInstituteView,
};
use crate::modules::auth::controller::ValidationErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service;

#[utoipa::path(
    post,
    path = "/api/institutes",
    request_body = CreateInstituteDto,
    responses(
        (status = 201, description = "Institute created", body = Institute),
        (status = 400, description = "Invalid request or unknown role id"),
        (status = 422, description = "Validation error", body = ValidationErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Institutes",
    security(("bearer_auth" = []))
)]
pub async fn create_institute(
    State(state): State<AppState>,
    _auth: RequireInstituteCreate,
    ValidatedJson(dto): ValidatedJson<CreateInstituteDto>,
) -> Result<(StatusCode, Json<Institute>), AppError> {
    let institute = service::create_institute(state.directory_store.as_ref(), dto).await?;
    Ok((StatusCode::CREATED, Json(institute)))
}

#[utoipa::path(
    get,
    path = "/api/institutes",
    params(
        ("search" = Option<String>, Query, description = "Match on name or email"),
        ("limit" = Option<i64>, Query, description = "Items per page"),
        ("offset" = Option<i64>, Query, description = "Items to skip"),
        ("page" = Option<i64>, Query, description = "Page number")
    ),
    responses(
        (status = 200, description = "Institutes visible to the caller", body = PaginatedInstitutesResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Institutes",
    security(("bearer_auth" = []))
)]
pub async fn get_institutes(
    State(state): State<AppState>,
    RequireInstituteList(auth): RequireInstituteList,
    Query(params): Query<InstituteFilterParams>,
) -> Result<Json<PaginatedInstitutesResponse>, AppError> {
    let result = service::list_institutes(
        state.directory_store.as_ref(),
        params,
        auth.institute_scope(),
    )
    .await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/institutes/{id}",
    params(("id" = InstituteId, Path, description = "Institute ID")),
    responses(
        (status = 200, description = "Institute details", body = Institute),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Institute not found")
    ),
    tag = "Institutes",
    security(("bearer_auth" = []))
)]
pub async fn get_institute(
    State(state): State<AppState>,
    RequireInstituteView(auth): RequireInstituteView,
    Path(id): Path<InstituteId>,
) -> Result<Json<Institute>, AppError> {
    let institute =
        service::get_institute(state.directory_store.as_ref(), id, auth.institute_scope())
            .await?;
    Ok(Json(institute))
}

#[utoipa::path(
    put,
    path = "/api/institutes/{id}/role",
    params(("id" = InstituteId, Path, description = "Institute ID")),
    request_body = LinkRoleDto,
    responses(
        (status = 200, description = "Role linked", body = Institute),
        (status = 400, description = "Unknown role id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Institute not found")
    ),
    tag = "Institutes",
    security(("bearer_auth" = []))
)]
pub async fn link_institute_role(
    State(state): State<AppState>,
    RequireInstituteUpdate(auth): RequireInstituteUpdate,
    Path(id): Path<InstituteId>,
    Json(dto): Json<LinkRoleDto>,
) -> Result<Json<Institute>, AppError> {
    let institute = service::link_role(
        state.directory_store.as_ref(),
        id,
        dto,
        auth.institute_scope(),
    )
    .await?;
    Ok(Json(institute))
}
