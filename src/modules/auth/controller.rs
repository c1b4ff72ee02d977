use axum::Json;
use axum::extract::State;
use tracing::instrument;
use utoipa::ToSchema;

use lectern_authz::AuthzError;
use lectern_core::AppError;
use lectern_models::{LoginRequest, LoginResponse, MeResponse};

use crate::middleware::auth::AuthPrincipal;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::AuthService;

#[derive(ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of a 422: every failing rule, keyed by field name
#[derive(ToSchema)]
pub struct ValidationErrorResponse {
    pub error: String,
    pub fields: std::collections::BTreeMap<String, Vec<String>>,
}

/// Denial produced by the authorization gate
#[derive(ToSchema)]
pub struct DenialResponse {
    pub error: String,
    /// One of UNAUTHENTICATED, NO_VALID_PERMISSIONS, INSUFFICIENT_PERMISSIONS, INTERNAL_ERROR
    pub code: String,
    pub required: Option<Vec<String>>,
    pub held: Option<Vec<String>>,
}

/// Login as an admin, institute, faculty member or user
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 422, description = "Validation error", body = ValidationErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 429, description = "Too many login attempts", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = AuthService::login(&state, dto).await?;
    Ok(Json(response))
}

/// The signed-in principal and the permissions it holds
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current principal", body = MeResponse),
        (status = 401, description = "Unauthenticated", body = DenialResponse),
        (status = 500, description = "Internal server error", body = DenialResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all)]
pub async fn me(
    State(state): State<AppState>,
    principal: AuthPrincipal,
) -> Result<Json<MeResponse>, AuthzError> {
    let response = AuthService::me(&state, &principal).await?;
    Ok(Json(response))
}
