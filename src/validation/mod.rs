//! Feature Validator - request payload checks before inference
//!
//! Turns the raw `features` array of a prediction request into a fixed
//! `[f64; FEATURE_COUNT]` vector, or reports which field is wrong and why.
//! Nothing here touches shared state.

use serde_json::Value;


// ============================================================================
// LAYOUT
// ============================================================================

pub const FEATURE_COUNT: usize = 4;

/// Feature names in model input order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "sepal_length",
    "sepal_width",
    "petal_length",
    "petal_width",
];

pub type Features = [f64; FEATURE_COUNT];

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("arity mismatch: expected {expected} features, got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("feature '{field}' must be a number, got {found}")]
    NotNumeric { field: &'static str, found: &'static str },

    #[error("feature '{field}' must be finite")]
    NotFinite { field: &'static str },

    #[error("feature '{field}' value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: String,
        max: String,
    },
}

// ============================================================================
// BOUNDS
// ============================================================================

/// Inclusive per-feature bounds; `None` leaves that side open
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBounds {
    pub min: [Option<f64>; FEATURE_COUNT],
    pub max: [Option<f64>; FEATURE_COUNT],
}

impl FeatureBounds {
    pub fn unconstrained() -> Self {
        Self {
            min: [None; FEATURE_COUNT],
            max: [None; FEATURE_COUNT],
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(Option::is_none)
    }

    fn check(&self, index: usize, value: f64) -> Result<(), ValidationError> {
        let below = self.min[index].is_some_and(|min| value < min);
        let above = self.max[index].is_some_and(|max| value > max);
        if below || above {
            return Err(ValidationError::OutOfRange {
                field: FEATURE_NAMES[index],
                value,
                min: fmt_bound(self.min[index], "-inf"),
                max: fmt_bound(self.max[index], "+inf"),
            });
        }
        Ok(())
    }
}

impl Default for FeatureBounds {
    fn default() -> Self {
        Self::unconstrained()
    }
}

fn fmt_bound(bound: Option<f64>, open: &str) -> String {
    bound.map(|b| b.to_string()).unwrap_or_else(|| open.to_string())
}

// ============================================================================
// VALIDATOR
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct FeatureValidator {
    bounds: FeatureBounds,
}

impl FeatureValidator {
    pub fn new(bounds: FeatureBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &FeatureBounds {
        &self.bounds
    }

    /// Validate raw JSON values. Arity is checked first, then each field
    /// in order; the first failing field is reported.
    pub fn validate(&self, raw: &[Value]) -> Result<Features, ValidationError> {
        if raw.len() != FEATURE_COUNT {
            return Err(ValidationError::Arity {
                expected: FEATURE_COUNT,
                actual: raw.len(),
            });
        }

        let mut features = [0.0; FEATURE_COUNT];
        for (i, value) in raw.iter().enumerate() {
            let field = FEATURE_NAMES[i];
            let number = value.as_f64().ok_or(ValidationError::NotNumeric {
                field,
                found: json_kind(value),
            })?;
            if !number.is_finite() {
                return Err(ValidationError::NotFinite { field });
            }
            self.bounds.check(i, number)?;
            features[i] = number;
        }

        Ok(features)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
