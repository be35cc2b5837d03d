//! Health check handler

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    model_version: Option<String>,
    version: &'static str,
    timestamp: i64,
}

/// Ready only while a model is loaded
pub async fn check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let model_version = state.model.current_version();
    let model_loaded = model_version.is_some();

    let (code, status) = if model_loaded {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (code, Json(HealthResponse {
        status,
        model_loaded,
        model_version,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
    }))
}
