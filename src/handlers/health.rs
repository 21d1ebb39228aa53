use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    health_status: String,
    uptime: String,
    version: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessCheckResponse {
    readiness_status: String,
    root_folder: bool,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthCheckResponse> {
    let uptime = state.start_time.elapsed().as_secs();
    Json(HealthCheckResponse {
        health_status: "ok".to_string(),
        uptime: format!("{}s", uptime),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn readiness_check(State(state): State<Arc<AppState>>) -> Json<ReadinessCheckResponse> {
    // Serving requires the managed root folder to be reachable.
    let root_accessible = state.config.root_path.exists();
    Json(ReadinessCheckResponse {
        readiness_status: if root_accessible {
            "ready".to_string()
        } else {
            "not_ready".to_string()
        },
        root_folder: root_accessible,
    })
}
