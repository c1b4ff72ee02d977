use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;

use super::controller::{
    assign_user_roles, create_role, delete_role, get_catalog, get_permissions, get_role,
    get_roles, get_user_roles, sync_role_permissions, update_role,
};

pub fn init_roles_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_roles).post(create_role))
        .route("/{id}", get(get_role).put(update_role).delete(delete_role))
        .route("/{id}/permissions", put(sync_role_permissions))
}

pub fn init_permissions_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_permissions))
        .route("/catalog", get(get_catalog))
}

pub fn init_user_roles_router() -> Router<AppState> {
    Router::new().route("/{id}/roles", get(get_user_roles).put(assign_user_roles))
}
