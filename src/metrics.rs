//! Prometheus metrics for the prediction service
//!
//! Metrics live in a per-state `Registry` rather than the global default
//! one, so each router (and each test) exposes only its own series.

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Latency buckets in seconds, 100µs to 1s
pub const LATENCY_BUCKETS: [f64; 11] = [
    0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.1, 0.25, 1.0,
];

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub requests: IntCounter,
    pub predictions: IntCounterVec,
    pub errors: IntCounterVec,
    pub latency: Histogram,
    pub drift_score: Gauge,
    pub model_loaded: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounter::new(
            "prediction_requests_total",
            "Total prediction requests received",
        )?;
        let predictions = IntCounterVec::new(
            Opts::new("prediction_count_total", "Predictions served per class"),
            &["class"],
        )?;
        let errors = IntCounterVec::new(
            Opts::new("prediction_errors_total", "Prediction pipeline errors by kind"),
            &["kind"],
        )?;
        let latency = Histogram::with_opts(
            HistogramOpts::new("prediction_latency_seconds", "Prediction latency in seconds")
                .buckets(LATENCY_BUCKETS.to_vec()),
        )?;
        let drift_score = Gauge::new(
            "feature_drift_score",
            "Max per-feature |z| of running mean against the training baseline",
        )?;
        let model_loaded = Gauge::new("model_loaded", "1 if a model is loaded, 0 otherwise")?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(predictions.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        registry.register(Box::new(drift_score.clone()))?;
        registry.register(Box::new(model_loaded.clone()))?;

        Ok(Self {
            registry,
            requests,
            predictions,
            errors,
            latency,
            drift_score,
            model_loaded,
        })
    }

    /// Record a served prediction
    pub fn record_prediction(&self, class: &str, duration_secs: f64) {
        self.predictions.with_label_values(&[class]).inc();
        self.latency.observe(duration_secs);
    }

    /// Record a pipeline error
    pub fn record_error(&self, kind: &str) {
        self.errors.with_label_values(&[kind]).inc();
    }

    pub fn set_model_loaded(&self, loaded: bool) {
        self.model_loaded.set(if loaded { 1.0 } else { 0.0 });
    }

    /// Encode all series in the text exposition format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&families, &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exposition_contains_stable_names() {
        let metrics = Metrics::new().unwrap();
        metrics.requests.inc();
        metrics.record_prediction("setosa", 0.003);
        metrics.record_error("validation");
        metrics.drift_score.set(1.25);
        metrics.set_model_loaded(true);

        let text = metrics.encode().unwrap();
        assert!(text.contains("prediction_requests_total 1"));
        assert!(text.contains("prediction_count_total{class=\"setosa\"} 1"));
        assert!(text.contains("prediction_errors_total{kind=\"validation\"} 1"));
        assert!(text.contains("prediction_latency_seconds_bucket{le=\"0.005\"} 1"));
        assert!(text.contains("prediction_latency_seconds_count 1"));
        assert!(text.contains("feature_drift_score 1.25"));
        assert!(text.contains("model_loaded 1"));
    }

    #[test]
    fn test_registries_are_independent() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.requests.inc();
        assert!(b.encode().unwrap().contains("prediction_requests_total 0"));
    }
}
