//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::model::ModelError;
use crate::validation::ValidationError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Client errors
    Validation(ValidationError),
    Unscorable(String),

    // Model errors
    ModelUnavailable,
    ModelLoad(String),

    // Generic errors
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unscorable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ModelUnavailable | AppError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for `prediction_errors_total{kind}`
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Unscorable(_) => "unscorable",
            AppError::ModelUnavailable => "model_unavailable",
            AppError::ModelLoad(_) => "model_load",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::Validation(err) => err.to_string(),
            AppError::Unscorable(msg) => msg.clone(),
            AppError::ModelUnavailable => ModelError::Unavailable.to_string(),
            AppError::ModelLoad(msg) => {
                tracing::error!("Model load error: {}", msg);
                format!("model unavailable: {}", msg)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Unavailable => AppError::ModelUnavailable,
            err @ ModelError::NonFinite { .. } => AppError::Unscorable(err.to_string()),
            other => AppError::ModelLoad(other.to_string()),
        }
    }
}

impl From<prometheus::Error> for AppError {
    fn from(err: prometheus::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
