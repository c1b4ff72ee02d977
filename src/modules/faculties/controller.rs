use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use lectern_core::AppError;
use lectern_models::{
    CreateFacultyDto, Faculty, FacultyFilterParams, FacultyId, LinkRoleDto,
    PaginatedFacultiesResponse,
};

use crate::middleware::auth::{
    RequireFacultyCreate, RequireFacultyList, RequireFacultyUpdate, RequireFacultyView,
};
use crate::modules::auth::controller::ValidationErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service;

#[utoipa::path(
    post,
    path = "/api/faculties",
    request_body = CreateFacultyDto,
    responses(
        (status = 201, description = "Faculty member created", body = Faculty),
        (status = 400, description = "Invalid request or unknown institute, department or role"),
        (status = 422, description = "Validation error", body = ValidationErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Faculties",
    security(("bearer_auth" = []))
)]
pub async fn create_faculty(
    State(state): State<AppState>,
    RequireFacultyCreate(auth): RequireFacultyCreate,
    ValidatedJson(dto): ValidatedJson<CreateFacultyDto>,
) -> Result<(StatusCode, Json<Faculty>), AppError> {
    let faculty =
        service::create_faculty(state.directory_store.as_ref(), dto, auth.institute_scope())
            .await?;
    Ok((StatusCode::CREATED, Json(faculty)))
}

#[utoipa::path(
    get,
    path = "/api/faculties",
    params(
        ("institute_id" = Option<String>, Query, description = "Filter by institute (ignored for institute-scoped callers)"),
        ("search" = Option<String>, Query, description = "Match on name or email"),
        ("limit" = Option<i64>, Query, description = "Items per page"),
        ("offset" = Option<i64>, Query, description = "Items to skip"),
        ("page" = Option<i64>, Query, description = "Page number")
    ),
    responses(
        (status = 200, description = "Faculty members visible to the caller", body = PaginatedFacultiesResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Faculties",
    security(("bearer_auth" = []))
)]
pub async fn get_faculties(
    State(state): State<AppState>,
    RequireFacultyList(auth): RequireFacultyList,
    Query(params): Query<FacultyFilterParams>,
) -> Result<Json<PaginatedFacultiesResponse>, AppError> {
    let result =
        service::list_faculties(state.directory_store.as_ref(), params, auth.institute_scope())
            .await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/faculties/{id}",
    params(("id" = FacultyId, Path, description = "Faculty ID")),
    responses(
        (status = 200, description = "Faculty details", body = Faculty),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Faculty not found")
    ),
    tag = "Faculties",
    security(("bearer_auth" = []))
)]
pub async fn get_faculty(
    State(state): State<AppState>,
    RequireFacultyView(auth): RequireFacultyView,
    Path(id): Path<FacultyId>,
) -> Result<Json<Faculty>, AppError> {
    let faculty =
        service::get_faculty(state.directory_store.as_ref(), id, auth.institute_scope()).await?;
    Ok(Json(faculty))
}

#[utoipa::path(
    put,
    path = "/api/faculties/{id}/role",
    params(("id" = FacultyId, Path, description = "Faculty ID")),
    request_body = LinkRoleDto,
    responses(
        (status = 200, description = "Role linked", body = Faculty),
        (status = 400, description = "Unknown role id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Faculty not found")
    ),
    tag = "Faculties",
    security(("bearer_auth" = []))
)]
pub async fn link_faculty_role(
    State(state): State<AppState>,
    RequireFacultyUpdate(auth): RequireFacultyUpdate,
    Path(id): Path<FacultyId>,
    Json(dto): Json<LinkRoleDto>,
) -> Result<Json<Faculty>, AppError> {
    let faculty = service::link_role(
        state.directory_store.as_ref(),
        id,
        dto,
        auth.institute_scope(),
    )
    .await?;
    Ok(Json(faculty))
}
