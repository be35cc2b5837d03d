//! Iris model-serving API
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        IRIS SERVING                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  POST /predict                                               │
//! │     │                                                        │
//! │     ▼                                                        │
//! │  ┌───────────┐   ┌──────────────┐   ┌─────────────────────┐ │
//! │  │ Feature   │──▶│ Model        │──▶│ Drift Monitor       │ │
//! │  │ Validator │   │ Wrapper      │   │ (Welford + z-score) │ │
//! │  └───────────┘   └──────┬───────┘   └──────────┬──────────┘ │
//! │                         │ load / reload        │            │
//! │                  ┌──────┴───────┐       ┌──────┴──────┐     │
//! │                  │ Model        │       │ Prometheus  │     │
//! │                  │ Registry     │       │ /metrics    │     │
//! │                  └──────────────┘       └─────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod model;
pub mod monitoring;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
    timeout::TimeoutLayer,
};

pub use error::{AppError, AppResult};

use config::Config;
use metrics::Metrics;
use model::{ModelError, ModelHandle, ModelInfo, ModelRegistry, ModelWrapper};
use monitoring::{DriftConfig, DriftMonitor};
use validation::FeatureValidator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub validator: Arc<FeatureValidator>,
    pub model: Arc<ModelWrapper>,
    pub monitor: Arc<DriftMonitor>,
    pub metrics: Metrics,
    pub registry: Arc<dyn ModelRegistry>,
}

impl AppState {
    /// State with no model loaded
    pub fn new(config: Config, registry: Arc<dyn ModelRegistry>) -> Result<Self, prometheus::Error> {
        let monitor = DriftMonitor::new(DriftConfig {
            threshold: config.drift_threshold,
            min_samples: config.drift_min_samples,
        });
        let metrics = Metrics::new()?;
        metrics.set_model_loaded(false);

        Ok(Self {
            validator: Arc::new(FeatureValidator::new(config.feature_bounds.clone())),
            config: Arc::new(config),
            model: Arc::new(ModelWrapper::new()),
            monitor: Arc::new(monitor),
            metrics,
            registry,
        })
    }

    /// Serve `handle`; the monitor switches to its baseline
    pub fn install(&self, handle: ModelHandle) -> ModelInfo {
        let info = handle.info();
        self.monitor.set_baseline(Some(handle.baseline().clone()));
        self.model.swap(handle);
        self.metrics.set_model_loaded(true);
        info
    }

    /// Startup load: registry first, reference model in testing mode
    pub fn load_initial_model(&self) -> Result<ModelInfo, ModelError> {
        if self.config.testing {
            tracing::info!("Testing mode detected, serving the reference model");
            return Ok(self.install(ModelHandle::reference(&self.config.model_name)));
        }

        let handle = model::load_from_registry(self.registry.as_ref(), &self.config.model_name)?;
        Ok(self.install(handle))
    }

    /// Fetch the promoted version again and swap it in
    pub async fn reload_from_registry(&self) -> Result<ModelInfo, ModelError> {
        let registry = Arc::clone(&self.registry);
        let model_name = self.config.model_name.clone();

        let handle = tokio::task::spawn_blocking(move || {
            model::load_from_registry(registry.as_ref(), &model_name)
        })
        .await
        .map_err(|e| {
            tracing::error!("Model reload task failed: {}", e);
            ModelError::Unavailable
        })??;

        Ok(self.install(handle))
    }

    /// Drop the served model (shutdown)
    pub fn unload(&self) {
        if let Some(handle) = self.model.unload() {
            tracing::info!("Model version {} unloaded", handle.version);
        }
        self.monitor.set_baseline(None);
        self.metrics.set_model_loaded(false);
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    // Serving and observability routes
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .route("/metrics", get(handlers::metrics::export))
        .route("/monitoring/statistics", get(handlers::monitoring::statistics))
        .route("/model/info", get(handlers::model::info));

    // Operator actions
    let admin_routes = Router::new()
        .route("/admin/model/reload", post(handlers::admin::reload_model))
        .route("/admin/statistics/reset", post(handlers::admin::reset_statistics));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
