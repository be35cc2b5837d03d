//! Drift score against the training baseline
//!
//! Per feature: `z_i = |running_mean_i - baseline_mean_i| / max(baseline_std_i, STD_FLOOR)`.
//! Aggregate: `drift_score = max_i z_i`. Zero with no samples or no baseline.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::BaselineStatistics;
use crate::validation::{FEATURE_COUNT, FEATURE_NAMES};

pub const AGGREGATION: &str = "max_abs_z";

/// Keeps constant baseline features from dividing by zero
const STD_FLOOR: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftConfig {
    pub threshold: f64,
    pub min_samples: u64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_samples: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftReport {
    pub drift_score: f64,
    pub aggregation: &'static str,
    pub feature_z_scores: BTreeMap<&'static str, f64>,
    pub threshold: f64,
    pub min_samples: u64,
    pub drift_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

pub fn z_scores(
    running_means: &[f64; FEATURE_COUNT],
    samples: u64,
    baseline: Option<&BaselineStatistics>,
) -> [f64; FEATURE_COUNT] {
    let mut z = [0.0; FEATURE_COUNT];
    let Some(baseline) = baseline else {
        return z;
    };
    if samples == 0 {
        return z;
    }

    for (i, zi) in z.iter_mut().enumerate() {
        *zi = (running_means[i] - baseline.mean[i]).abs() / baseline.std[i].max(STD_FLOOR);
    }
    z
}

pub fn aggregate(z: &[f64; FEATURE_COUNT]) -> f64 {
    z.iter().copied().fold(0.0, f64::max)
}

pub fn report(
    running_means: &[f64; FEATURE_COUNT],
    samples: u64,
    baseline: Option<&BaselineStatistics>,
    config: &DriftConfig,
) -> DriftReport {
    let z = z_scores(running_means, samples, baseline);
    let drift_score = aggregate(&z);

    let reason = if baseline.is_none() {
        Some("No baseline loaded")
    } else if samples < config.min_samples {
        Some("Insufficient data")
    } else {
        None
    };

    DriftReport {
        drift_score,
        aggregation: AGGREGATION,
        feature_z_scores: FEATURE_NAMES.iter().copied().zip(z).collect(),
        threshold: config.threshold,
        min_samples: config.min_samples,
        drift_detected: reason.is_none() && drift_score > config.threshold,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> BaselineStatistics {
        BaselineStatistics {
            mean: [5.0, 3.0, 4.0, 1.0],
            std: [1.0, 0.5, 2.0, 0.0],
        }
    }

    #[test]
    fn test_zero_without_samples_or_baseline() {
        let means = [9.0, 9.0, 9.0, 9.0];
        assert_eq!(aggregate(&z_scores(&means, 0, Some(&baseline()))), 0.0);
        assert_eq!(aggregate(&z_scores(&means, 10, None)), 0.0);
    }

    #[test]
    fn test_max_aggregation() {
        let means = [6.0, 3.0, 3.0, 1.0];
        let z = z_scores(&means, 10, Some(&baseline()));
        assert_eq!(z, [1.0, 0.0, 0.5, 0.0]);
        assert_eq!(aggregate(&z), 1.0);
    }

    #[test]
    fn test_constant_baseline_feature_is_floored() {
        let means = [5.0, 3.0, 4.0, 1.0 + 1e-6];
        let z = z_scores(&means, 1, Some(&baseline()));
        assert!(z[3].is_finite());
        assert!(z[3] > 100.0);
    }

    #[test]
    fn test_detection_requires_min_samples() {
        let config = DriftConfig { threshold: 0.5, min_samples: 100 };
        let means = [8.0, 3.0, 4.0, 1.0];

        let early = report(&means, 99, Some(&baseline()), &config);
        assert_eq!(early.drift_score, 3.0);
        assert!(!early.drift_detected);
        assert_eq!(early.reason, Some("Insufficient data"));

        let later = report(&means, 100, Some(&baseline()), &config);
        assert!(later.drift_detected);
        assert_eq!(later.reason, None);
        assert_eq!(later.feature_z_scores["sepal_length"], 3.0);
    }
}
