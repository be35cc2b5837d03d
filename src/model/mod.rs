//! Model Module - classifier artifact, registry client and served model
//!
//! Loading and swapping live here; the prediction itself is a pure
//! function of the artifact.

pub mod artifact;
pub mod registry;
pub mod wrapper;

// Re-export common types
pub use artifact::{ArtifactError, BaselineStatistics, ModelArtifact, Prediction, CLASS_COUNT};
pub use registry::{FsRegistry, ModelRegistry, RegistryError};
pub use wrapper::{load_from_registry, ModelError, ModelHandle, ModelInfo, ModelSource, ModelWrapper};
