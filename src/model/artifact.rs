//! Serialized classifier artifact
//!
//! The artifact is a Gaussian naive Bayes model exported as JSON by the
//! training job, together with the baseline feature statistics of the
//! training set.

use serde::{Deserialize, Serialize};

use crate::validation::{Features, FEATURE_COUNT};

pub const CLASS_COUNT: usize = 3;

/// Per-feature training distribution, fixed once the model is promoted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineStatistics {
    pub mean: [f64; FEATURE_COUNT],
    pub std: [f64; FEATURE_COUNT],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub classes: Vec<String>,
    pub class_priors: Vec<f64>,
    pub class_means: Vec<[f64; FEATURE_COUNT]>,
    pub class_variances: Vec<[f64; FEATURE_COUNT]>,
    pub baseline: BaselineStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    pub class_index: usize,
    pub confidence: f64,
    pub probabilities: Vec<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("expected {expected} classes in '{field}', found {actual}")]
    ClassCount {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("class labels must be non-empty and distinct")]
    Labels,

    #[error("'{field}' contains an invalid value: {reason}")]
    Value { field: &'static str, reason: &'static str },
}

impl ModelArtifact {
    /// Decode and validate artifact bytes
    pub fn parse(bytes: &[u8]) -> Result<Self, ArtifactError> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        check_len("classes", self.classes.len())?;
        check_len("class_priors", self.class_priors.len())?;
        check_len("class_means", self.class_means.len())?;
        check_len("class_variances", self.class_variances.len())?;

        let mut labels: Vec<&str> = self.classes.iter().map(String::as_str).collect();
        labels.sort_unstable();
        labels.dedup();
        if labels.len() != CLASS_COUNT || labels.iter().any(|l| l.trim().is_empty()) {
            return Err(ArtifactError::Labels);
        }

        if self.class_priors.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(ArtifactError::Value {
                field: "class_priors",
                reason: "priors must be positive",
            });
        }
        if self.class_means.iter().flatten().any(|m| !m.is_finite()) {
            return Err(ArtifactError::Value {
                field: "class_means",
                reason: "means must be finite",
            });
        }
        if self
            .class_variances
            .iter()
            .flatten()
            .any(|v| !v.is_finite() || *v <= 0.0)
        {
            return Err(ArtifactError::Value {
                field: "class_variances",
                reason: "variances must be positive",
            });
        }
        if self.baseline.mean.iter().any(|m| !m.is_finite()) {
            return Err(ArtifactError::Value {
                field: "baseline.mean",
                reason: "means must be finite",
            });
        }
        if self.baseline.std.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(ArtifactError::Value {
                field: "baseline.std",
                reason: "standard deviations must be non-negative",
            });
        }

        Ok(())
    }

    /// Pure, synchronous classification of one feature vector.
    /// `None` when no class has a finite log-posterior, which happens
    /// once a feature is far enough from every class mean to overflow.
    pub fn predict(&self, x: &Features) -> Option<Prediction> {
        let log_posteriors: Vec<f64> = (0..self.classes.len())
            .map(|c| {
                let log_likelihood: f64 = x
                    .iter()
                    .zip(self.class_means[c].iter())
                    .zip(self.class_variances[c].iter())
                    .map(|((xi, mu), var)| {
                        let z = (xi - mu) / var.sqrt();
                        -0.5 * ((2.0 * std::f64::consts::PI * var).ln() + z * z)
                    })
                    .sum();
                self.class_priors[c].ln() + log_likelihood
            })
            .collect();

        // Softmax with max subtraction
        let max = log_posteriors
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return None;
        }
        let exp: Vec<f64> = log_posteriors.iter().map(|lp| (lp - max).exp()).collect();
        let total: f64 = exp.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return None;
        }
        let probabilities: Vec<f64> = exp.iter().map(|e| e / total).collect();

        let class_index = probabilities
            .iter()
            .enumerate()
            .fold(0, |best, (i, p)| if *p > probabilities[best] { i } else { best });

        Some(Prediction {
            label: self.classes[class_index].clone(),
            class_index,
            confidence: probabilities[class_index],
            probabilities,
        })
    }

    /// Reference model built from the canonical Iris per-class statistics
    pub fn iris_reference() -> Self {
        let stds = [
            [0.352, 0.379, 0.174, 0.105],
            [0.516, 0.314, 0.470, 0.198],
            [0.636, 0.322, 0.552, 0.275],
        ];

        Self {
            name: "iris-reference".to_string(),
            classes: vec![
                "setosa".to_string(),
                "versicolor".to_string(),
                "virginica".to_string(),
            ],
            class_priors: vec![1.0 / 3.0; CLASS_COUNT],
            class_means: vec![
                [5.006, 3.428, 1.462, 0.246],
                [5.936, 2.770, 4.260, 1.326],
                [6.588, 2.974, 5.552, 2.026],
            ],
            class_variances: stds.iter().map(|s| s.map(|v| v * v)).collect(),
            baseline: BaselineStatistics {
                mean: [5.843, 3.057, 3.758, 1.199],
                std: [0.825, 0.434, 1.759, 0.760],
            },
        }
    }
}

fn check_len(field: &'static str, actual: usize) -> Result<(), ArtifactError> {
    if actual != CLASS_COUNT {
        return Err(ArtifactError::ClassCount {
            field,
            expected: CLASS_COUNT,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_is_valid() {
        assert!(ModelArtifact::iris_reference().validate().is_ok());
    }

    #[test]
    fn test_reference_classifies_canonical_samples() {
        let model = ModelArtifact::iris_reference();
        assert_eq!(model.predict(&[5.1, 3.5, 1.4, 0.2]).unwrap().label, "setosa");
        assert_eq!(model.predict(&[6.2, 2.9, 4.3, 1.3]).unwrap().label, "versicolor");
        assert_eq!(model.predict(&[7.7, 3.0, 6.1, 2.3]).unwrap().label, "virginica");
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let model = ModelArtifact::iris_reference();
        let p = model.predict(&[6.5, 3.0, 5.2, 2.0]).unwrap();
        let total: f64 = p.probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(p.confidence, p.probabilities[p.class_index]);
        assert!(p.confidence >= 1.0 / 3.0);
    }

    #[test]
    fn test_far_outlier_still_gets_a_label() {
        let model = ModelArtifact::iris_reference();
        let p = model.predict(&[1000.0, -1000.0, 1000.0, -1000.0]).unwrap();
        assert!(model.classes.contains(&p.label));
        assert!(p.confidence.is_finite());
    }

    #[test]
    fn test_overflowing_feature_has_no_prediction() {
        let model = ModelArtifact::iris_reference();
        assert_eq!(model.predict(&[1e200, 3.5, 1.4, 0.2]), None);
        assert_eq!(model.predict(&[5.1, 3.5, -1e300, 0.2]), None);
    }

    #[test]
    fn test_parse_round_trips_reference() {
        let bytes = serde_json::to_vec(&ModelArtifact::iris_reference()).unwrap();
        let parsed = ModelArtifact::parse(&bytes).unwrap();
        assert_eq!(parsed.classes.len(), 3);
    }

    #[test]
    fn test_rejects_two_classes() {
        let mut artifact = ModelArtifact::iris_reference();
        artifact.classes.pop();
        match artifact.validate() {
            Err(ArtifactError::ClassCount { field, actual, .. }) => {
                assert_eq!(field, "classes");
                assert_eq!(actual, 2);
            }
            other => panic!("Expected ClassCount, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_duplicate_labels() {
        let mut artifact = ModelArtifact::iris_reference();
        artifact.classes[2] = "setosa".to_string();
        assert!(matches!(artifact.validate(), Err(ArtifactError::Labels)));
    }

    #[test]
    fn test_rejects_zero_variance() {
        let mut artifact = ModelArtifact::iris_reference();
        artifact.class_variances[1][0] = 0.0;
        assert!(matches!(
            artifact.validate(),
            Err(ArtifactError::Value { field: "class_variances", .. })
        ));
    }

    #[test]
    fn test_rejects_garbage_bytes() {
        assert!(matches!(
            ModelArtifact::parse(b"not json"),
            Err(ArtifactError::Decode(_))
        ));
    }
}
