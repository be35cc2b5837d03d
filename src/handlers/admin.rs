//! Operator actions: model reload and statistics reset
//!
//! Promotion itself happens in the registry (see the `promote` binary);
//! a reload only picks up whatever is promoted there now.

use axum::{extract::State, http::StatusCode, Json};

use crate::model::ModelInfo;
use crate::{AppResult, AppState};

/// Reload the promoted model; on failure the current model keeps serving
pub async fn reload_model(State(state): State<AppState>) -> AppResult<Json<ModelInfo>> {
    let previous = state.model.current_version();

    match state.reload_from_registry().await {
        Ok(info) => {
            tracing::info!(
                "Model reloaded: {} -> {}",
                previous.as_deref().unwrap_or("none"),
                info.version
            );
            Ok(Json(info))
        }
        Err(e) => {
            tracing::warn!("Model reload failed, keeping {:?}: {}", previous, e);
            state.metrics.record_error("model_load");
            Err(e.into())
        }
    }
}

pub async fn reset_statistics(State(state): State<AppState>) -> StatusCode {
    state.monitor.reset();
    StatusCode::NO_CONTENT
}
