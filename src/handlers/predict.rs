//! Prediction handler
//!
//! Each request moves through `received -> validated -> predicted ->
//! monitored -> responded`, stopping at the first failing stage. Nothing
//! between validation and the response awaits, so a request dropped by
//! a timeout or disconnect never commits a partial monitor update.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::ValidationError;
use crate::{AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct PredictionRequest {
    pub features: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: String,
    pub confidence: f64,
    pub probabilities: Vec<f64>,
    pub model_version: String,
    pub request_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    Validated,
    Predicted,
}

impl Stage {
    /// Step that fails when a request stops in this stage
    fn next_step(self) -> &'static str {
        match self {
            Stage::Received => "validation",
            Stage::Validated => "prediction",
            Stage::Predicted => "monitoring",
        }
    }
}

/// Make a prediction
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> AppResult<Json<PredictionResponse>> {
    let started = Instant::now();
    state.metrics.requests.inc();

    let mut stage = Stage::Received;
    let result = match payload {
        Ok(Json(request)) => serve(&state, &request, started, &mut stage),
        Err(rejection) => Err(ValidationError::MalformedBody(rejection.body_text()).into()),
    };

    match result {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            state.metrics.record_error(err.kind());
            if stage == Stage::Validated {
                state.monitor.record_error();
            }
            tracing::warn!("Prediction failed at {} step: {:?}", stage.next_step(), err);
            Err(err)
        }
    }
}

fn serve(
    state: &AppState,
    request: &PredictionRequest,
    started: Instant,
    stage: &mut Stage,
) -> AppResult<PredictionResponse> {
    let features = state.validator.validate(&request.features)?;
    *stage = Stage::Validated;

    let (handle, prediction) = state.model.predict(&features)?;
    *stage = Stage::Predicted;

    let latency = started.elapsed();
    if let Err(e) = state.monitor.record(&features, &prediction.label, latency) {
        // Bookkeeping must never fail a prediction
        tracing::error!("Monitoring update failed: {}", e);
        state.metrics.record_error("monitoring");
    }
    state.metrics.record_prediction(&prediction.label, latency.as_secs_f64());

    tracing::info!(
        "Prediction made: {} (confidence {:.3}, model {}, {:.3}ms)",
        prediction.label,
        prediction.confidence,
        handle.version,
        latency.as_secs_f64() * 1000.0
    );

    Ok(PredictionResponse {
        prediction: prediction.label,
        confidence: prediction.confidence,
        probabilities: prediction.probabilities,
        model_version: handle.version.clone(),
        request_id: format!("req_{}", Uuid::new_v4().simple()),
    })
}
