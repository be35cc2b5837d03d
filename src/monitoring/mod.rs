//! Drift Monitor - running feature statistics of served requests
//!
//! How it works:
//! 1. Every served prediction is recorded once, under a single mutex
//! 2. Running per-feature mean/variance use Welford's update
//! 3. The drift score compares running means with the model baseline
//!
//! State lives for the process lifetime and is cleared only by `reset`.

pub mod drift;
pub mod welford;


use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use crate::model::BaselineStatistics;
use crate::validation::{Features, FEATURE_COUNT, FEATURE_NAMES};

pub use drift::{DriftConfig, DriftReport};
pub use welford::{FeatureSummary, RunningStat};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MonitoringError {
    #[error("cannot record non-finite value for feature '{field}'")]
    NonFinite { field: &'static str },

    #[error("running statistics for feature '{field}' would overflow")]
    Overflow { field: &'static str },
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Default)]
struct MonitorState {
    features: [RunningStat; FEATURE_COUNT],
    prediction_counts: BTreeMap<String, u64>,
    latency_sum: f64,
    error_count: u64,
    baseline: Option<BaselineStatistics>,
}

impl MonitorState {
    fn running_means(&self) -> [f64; FEATURE_COUNT] {
        let mut means = [0.0; FEATURE_COUNT];
        for (m, stat) in means.iter_mut().zip(self.features.iter()) {
            *m = stat.mean();
        }
        means
    }

    fn samples(&self) -> u64 {
        self.features[0].count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsSnapshot {
    pub request_count: u64,
    pub running: Vec<FeatureSummary>,
    pub baseline: Option<BaselineStatistics>,
    pub drift: DriftReport,
    pub prediction_counts: BTreeMap<String, u64>,
    pub average_latency_seconds: f64,
    pub error_count: u64,
    pub uptime_seconds: f64,
}

// ============================================================================
// DRIFT MONITOR
// ============================================================================

#[derive(Debug)]
pub struct DriftMonitor {
    state: Mutex<MonitorState>,
    config: DriftConfig,
    started_at: Instant,
}

impl DriftMonitor {
    pub fn new(config: DriftConfig) -> Self {
        tracing::info!(
            "Drift monitor initialized: threshold={:.2}, min_samples={}",
            config.threshold,
            config.min_samples
        );
        Self {
            state: Mutex::new(MonitorState::default()),
            config,
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    /// Baseline of the model now being served
    pub fn set_baseline(&self, baseline: Option<BaselineStatistics>) {
        self.state.lock().baseline = baseline;
    }

    /// Record one served prediction and return the updated drift score.
    /// All features are folded into copies first and committed together,
    /// so a failed call leaves the statistics untouched.
    pub fn record(
        &self,
        features: &Features,
        label: &str,
        latency: Duration,
    ) -> Result<f64, MonitoringError> {
        if let Some(i) = features.iter().position(|x| !x.is_finite()) {
            return Err(MonitoringError::NonFinite {
                field: FEATURE_NAMES[i],
            });
        }

        let mut state = self.state.lock();
        let mut next = state.features;
        for (i, (stat, x)) in next.iter_mut().zip(features.iter()).enumerate() {
            *stat = stat.updated(*x).ok_or(MonitoringError::Overflow {
                field: FEATURE_NAMES[i],
            })?;
        }
        state.features = next;
        *state.prediction_counts.entry(label.to_string()).or_insert(0) += 1;
        state.latency_sum += latency.as_secs_f64();

        let z = drift::z_scores(&state.running_means(), state.samples(), state.baseline.as_ref());
        Ok(drift::aggregate(&z))
    }

    pub fn record_error(&self) {
        self.state.lock().error_count += 1;
    }

    pub fn request_count(&self) -> u64 {
        self.state.lock().samples()
    }

    pub fn drift_score(&self) -> f64 {
        let state = self.state.lock();
        let z = drift::z_scores(&state.running_means(), state.samples(), state.baseline.as_ref());
        drift::aggregate(&z)
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        let state = self.state.lock();
        let samples = state.samples();

        let running = state
            .features
            .iter()
            .zip(FEATURE_NAMES)
            .map(|(stat, name)| stat.summary(name))
            .collect();

        let drift = drift::report(
            &state.running_means(),
            samples,
            state.baseline.as_ref(),
            &self.config,
        );

        StatisticsSnapshot {
            request_count: samples,
            running,
            baseline: state.baseline.clone(),
            drift,
            prediction_counts: state.prediction_counts.clone(),
            average_latency_seconds: if samples > 0 {
                state.latency_sum / samples as f64
            } else {
                0.0
            },
            error_count: state.error_count,
            uptime_seconds: self.started_at.elapsed().as_secs_f64(),
        }
    }

    /// Admin reset; the baseline is kept
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let baseline = state.baseline.take();
        *state = MonitorState {
            baseline,
            ..MonitorState::default()
        };
        tracing::info!("Running statistics reset");
    }
}

impl Default for DriftMonitor {
    fn default() -> Self {
        Self::new(DriftConfig::default())
    }
}
