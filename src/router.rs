use crate::handlers::{health, operations, transfer};
use crate::middleware::logging;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    let api_routes = Router::new()
        .route("/operations", post(operations::file_operations))
        .route("/download", post(transfer::download))
        .route("/image", get(transfer::get_image))
        .route(
            "/upload",
            post(transfer::upload).layer(axum::extract::DefaultBodyLimit::disable()),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .nest("/api/filemanager", api_routes)
        .layer(middleware::from_fn(logging::logging_middleware))
        .with_state(state)
}
