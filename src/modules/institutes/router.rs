use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;

use super::controller::{create_institute, get_institute, get_institutes, link_institute_role};

pub fn init_institutes_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_institutes).post(create_institute))
        .route("/{id}", get(get_institute))
        .route("/{id}/role", put(link_institute_role))
}
