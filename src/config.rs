//! Configuration module

use std::env;
use std::path::PathBuf;

use crate::validation::{FeatureBounds, FEATURE_COUNT};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Registered model name in the registry
    pub model_name: String,

    /// Root directory of the model registry
    pub registry_dir: PathBuf,

    /// Testing mode: serve the built-in reference model
    pub testing: bool,

    /// Drift score above which drift is reported
    pub drift_threshold: f64,

    /// Samples required before drift can be reported
    pub drift_min_samples: u64,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Optional per-feature value bounds
    pub feature_bounds: FeatureBounds,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("FEATURE_BOUNDS must have {expected} comma-separated entries, got {actual}")]
    BoundsArity { expected: usize, actual: usize },

    #[error("invalid FEATURE_BOUNDS entry '{entry}': {reason}")]
    BoundsEntry { entry: String, reason: String },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_name: "iris-classifier".to_string(),
            registry_dir: PathBuf::from("./mlruns-registry"),
            testing: false,
            drift_threshold: 0.5,
            drift_min_samples: 100,
            request_timeout_secs: 10,
            feature_bounds: FeatureBounds::unconstrained(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let feature_bounds = match env::var("FEATURE_BOUNDS") {
            Ok(raw) if !raw.trim().is_empty() => parse_bounds(&raw)?,
            _ => defaults.feature_bounds,
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),

            port: parse_or("PORT", defaults.port),

            model_name: env::var("MODEL_NAME").unwrap_or(defaults.model_name),

            registry_dir: env::var("MODEL_REGISTRY_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.registry_dir),

            testing: env::var("TESTING")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),

            drift_threshold: parse_or("DRIFT_THRESHOLD", defaults.drift_threshold),

            drift_min_samples: parse_or("DRIFT_MIN_SAMPLES", defaults.drift_min_samples),

            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),

            feature_bounds,
        })
    }
}

/// `LOG_FORMAT=json` switches log output to JSON lines. Read before the
/// rest of the configuration so that config warnings are already logged.
pub fn json_logs_requested() -> bool {
    env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn parse_or<T: std::str::FromStr + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {}='{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

/// Parse `min..max` entries, one per feature; an empty entry leaves
/// that feature unconstrained and either side of `..` may be omitted.
pub fn parse_bounds(raw: &str) -> Result<FeatureBounds, ConfigError> {
    let entries: Vec<&str> = raw.split(',').map(str::trim).collect();
    if entries.len() != FEATURE_COUNT {
        return Err(ConfigError::BoundsArity {
            expected: FEATURE_COUNT,
            actual: entries.len(),
        });
    }

    let mut bounds = FeatureBounds::unconstrained();
    for (i, entry) in entries.iter().enumerate() {
        if entry.is_empty() {
            continue;
        }
        let (lo, hi) = entry.split_once("..").ok_or_else(|| ConfigError::BoundsEntry {
            entry: entry.to_string(),
            reason: "expected 'min..max'".to_string(),
        })?;

        let parse_side = |side: &str| -> Result<Option<f64>, ConfigError> {
            let side = side.trim();
            if side.is_empty() {
                return Ok(None);
            }
            let value = side.parse::<f64>().map_err(|e| ConfigError::BoundsEntry {
                entry: entry.to_string(),
                reason: e.to_string(),
            })?;
            if !value.is_finite() {
                return Err(ConfigError::BoundsEntry {
                    entry: entry.to_string(),
                    reason: "bound must be finite".to_string(),
                });
            }
            Ok(Some(value))
        };

        let min = parse_side(lo)?;
        let max = parse_side(hi)?;
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(ConfigError::BoundsEntry {
                    entry: entry.to_string(),
                    reason: "min is greater than max".to_string(),
                });
            }
        }
        bounds.min[i] = min;
        bounds.max[i] = max;
    }

    Ok(bounds)
}
