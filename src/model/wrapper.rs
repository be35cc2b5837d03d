//! Model Wrapper - the single served model and its atomic swap
//!
//! Readers clone the current `Arc<ModelHandle>` and drop the lock before
//! predicting, so a swap never blocks on in-flight predictions and a
//! request always finishes against the version it started with.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::artifact::{ArtifactError, BaselineStatistics, ModelArtifact, Prediction};
use super::registry::{resolve_version, ModelRegistry, RegistryError};
use crate::validation::Features;

pub const REFERENCE_VERSION: &str = "reference";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model unavailable: no model is loaded")]
    Unavailable,

    #[error("model {version} cannot score these features: log-likelihood overflows for every class")]
    NonFinite { version: String },

    #[error("model registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("invalid model artifact for version {version}: {source}")]
    Artifact {
        version: String,
        #[source]
        source: ArtifactError,
    },
}

/// Where the served model came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Registry,
    Reference,
}

/// A loaded, immutable model version
#[derive(Debug)]
pub struct ModelHandle {
    pub model_name: String,
    pub version: String,
    pub promoted: bool,
    pub source: ModelSource,
    pub sha256: String,
    pub loaded_at: DateTime<Utc>,
    artifact: ModelArtifact,
}

impl ModelHandle {
    /// Parse registry artifact bytes
    pub fn from_bytes(
        model_name: &str,
        version: &str,
        promoted: bool,
        bytes: &[u8],
    ) -> Result<Self, ModelError> {
        let artifact = ModelArtifact::parse(bytes).map_err(|source| ModelError::Artifact {
            version: version.to_string(),
            source,
        })?;

        Ok(Self {
            model_name: model_name.to_string(),
            version: version.to_string(),
            promoted,
            source: ModelSource::Registry,
            sha256: fingerprint(bytes),
            loaded_at: Utc::now(),
            artifact,
        })
    }

    /// Built-in Iris reference model used in testing mode
    pub fn reference(model_name: &str) -> Self {
        let artifact = ModelArtifact::iris_reference();
        let bytes = serde_json::to_vec(&artifact).unwrap_or_default();

        Self {
            model_name: model_name.to_string(),
            version: REFERENCE_VERSION.to_string(),
            promoted: false,
            source: ModelSource::Reference,
            sha256: fingerprint(&bytes),
            loaded_at: Utc::now(),
            artifact,
        }
    }

    pub fn predict(&self, features: &Features) -> Result<Prediction, ModelError> {
        self.artifact
            .predict(features)
            .ok_or_else(|| ModelError::NonFinite {
                version: self.version.clone(),
            })
    }

    pub fn classes(&self) -> &[String] {
        &self.artifact.classes
    }

    pub fn baseline(&self) -> &BaselineStatistics {
        &self.artifact.baseline
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            model_name: self.model_name.clone(),
            version: self.version.clone(),
            model_uri: format!("models:/{}/{}", self.model_name, self.version),
            promoted: self.promoted,
            source: self.source,
            sha256: self.sha256.clone(),
            loaded_at: self.loaded_at,
            classes: self.artifact.classes.clone(),
            model_type: "gaussian_naive_bayes",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub version: String,
    pub model_uri: String,
    pub promoted: bool,
    pub source: ModelSource,
    pub sha256: String,
    pub loaded_at: DateTime<Utc>,
    pub classes: Vec<String>,
    pub model_type: &'static str,
}

/// Fetch and parse the version the registry says should be served
pub fn load_from_registry(
    registry: &dyn ModelRegistry,
    model_name: &str,
) -> Result<ModelHandle, ModelError> {
    let (version, promoted) = resolve_version(registry, model_name)?;
    let bytes = registry.fetch_artifact(model_name, version)?;
    let handle = ModelHandle::from_bytes(model_name, &version.to_string(), promoted, &bytes)?;

    tracing::info!(
        "Loaded {} model '{}' version {} (sha256 {})",
        if promoted { "production" } else { "latest" },
        model_name,
        handle.version,
        &handle.sha256[..12]
    );
    Ok(handle)
}

// ============================================================================
// WRAPPER
// ============================================================================

#[derive(Debug, Default)]
pub struct ModelWrapper {
    current: RwLock<Option<Arc<ModelHandle>>>,
}

impl ModelWrapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handle(handle: ModelHandle) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(handle))),
        }
    }

    /// Snapshot of the served model; holds no lock after return
    pub fn current(&self) -> Option<Arc<ModelHandle>> {
        self.current.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn current_version(&self) -> Option<String> {
        self.current().map(|h| h.version.clone())
    }

    pub fn info(&self) -> Option<ModelInfo> {
        self.current().map(|h| h.info())
    }

    /// Predict against the current model, returning the handle used
    pub fn predict(
        &self,
        features: &Features,
    ) -> Result<(Arc<ModelHandle>, Prediction), ModelError> {
        let handle = self.current().ok_or(ModelError::Unavailable)?;
        let prediction = handle.predict(features)?;
        Ok((handle, prediction))
    }

    /// Replace the served model, returning the previous one
    pub fn swap(&self, handle: ModelHandle) -> Option<Arc<ModelHandle>> {
        let version = handle.version.clone();
        let previous = self.current.write().replace(Arc::new(handle));
        match &previous {
            Some(prev) => tracing::info!("Model swapped: version {} -> {}", prev.version, version),
            None => tracing::info!("Model version {} installed", version),
        }
        previous
    }

    pub fn unload(&self) -> Option<Arc<ModelHandle>> {
        self.current.write().take()
    }
}

fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
