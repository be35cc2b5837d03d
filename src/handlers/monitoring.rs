//! Drift monitor snapshot

use axum::{extract::State, Json};

use crate::monitoring::StatisticsSnapshot;
use crate::AppState;

pub async fn statistics(State(state): State<AppState>) -> Json<StatisticsSnapshot> {
    Json(state.monitor.statistics())
}
