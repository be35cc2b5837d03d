//! Served model information

use axum::{extract::State, Json};

use crate::model::ModelInfo;
use crate::{AppError, AppResult, AppState};

pub async fn info(State(state): State<AppState>) -> AppResult<Json<ModelInfo>> {
    state.model.info().map(Json).ok_or(AppError::ModelUnavailable)
}
