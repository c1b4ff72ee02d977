use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;

use super::controller::{create_faculty, get_faculties, get_faculty, link_faculty_role};

pub fn init_faculties_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_faculties).post(create_faculty))
        .route("/{id}", get(get_faculty))
        .route("/{id}/role", put(link_faculty_role))
}
