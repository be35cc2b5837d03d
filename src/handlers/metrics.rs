//! Prometheus scrape endpoint

use axum::{extract::State, http::header::CONTENT_TYPE, response::IntoResponse};

use crate::{AppState, AppResult};

pub async fn export(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    // Gauges mirror current state at scrape time
    state.metrics.set_model_loaded(state.model.is_loaded());
    state.metrics.drift_score.set(state.monitor.drift_score());
    let body = state.metrics.encode()?;
    Ok(([(CONTENT_TYPE, state.metrics.content_type())], body))
}
