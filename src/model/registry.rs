//! Model registry client
//!
//! The registry is owned by the experiment tracker. This service only
//! reads which version is promoted and fetches artifact bytes.
//!
//! Directory layout of [`FsRegistry`]:
//!
//! ```text
//! <root>/<model_name>/PRODUCTION        promoted version number
//! <root>/<model_name>/<version>/model.json
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const ARTIFACT_FILE: &str = "model.json";
pub const PROMOTION_FILE: &str = "PRODUCTION";

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no versions registered for model '{0}'")]
    NoVersions(String),

    #[error("version {version} of model '{model}' does not exist")]
    UnknownVersion { model: String, version: u64 },

    #[error("promotion marker at {path} is invalid: '{content}'")]
    BadPromotion { path: PathBuf, content: String },
}

/// Read-side contract with the external registry
pub trait ModelRegistry: Send + Sync {
    /// All registered version numbers, ascending
    fn list_versions(&self, model_name: &str) -> Result<Vec<u64>, RegistryError>;

    /// Version currently promoted to production, if any
    fn promoted_version(&self, model_name: &str) -> Result<Option<u64>, RegistryError>;

    /// Raw artifact bytes of one version
    fn fetch_artifact(&self, model_name: &str, version: u64) -> Result<Vec<u8>, RegistryError>;
}

/// Version to serve: the promoted one if it is still registered,
/// otherwise the highest registered version.
pub fn resolve_version(
    registry: &dyn ModelRegistry,
    model_name: &str,
) -> Result<(u64, bool), RegistryError> {
    let versions = registry.list_versions(model_name)?;

    if let Some(promoted) = registry.promoted_version(model_name)? {
        if versions.contains(&promoted) {
            return Ok((promoted, true));
        }
        tracing::warn!(
            "Promoted version {} of '{}' is not registered, falling back to latest",
            promoted,
            model_name
        );
    }

    versions
        .last()
        .map(|v| (*v, false))
        .ok_or_else(|| RegistryError::NoVersions(model_name.to_string()))
}

// ============================================================================
// FILESYSTEM REGISTRY
// ============================================================================

#[derive(Debug, Clone)]
pub struct FsRegistry {
    root: PathBuf,
}

impl FsRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn model_dir(&self, model_name: &str) -> PathBuf {
        self.root.join(model_name)
    }

    /// Store an artifact as a new version and return its number
    pub fn register(&self, model_name: &str, artifact: &[u8]) -> Result<u64, RegistryError> {
        let next = self.list_versions(model_name)?.last().map_or(1, |v| v + 1);
        let dir = self.model_dir(model_name).join(next.to_string());
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        let path = dir.join(ARTIFACT_FILE);
        fs::write(&path, artifact).map_err(|e| io_err(&path, e))?;
        Ok(next)
    }

    /// Mark `version` as the production version
    pub fn promote(&self, model_name: &str, version: u64) -> Result<(), RegistryError> {
        if !self.list_versions(model_name)?.contains(&version) {
            return Err(RegistryError::UnknownVersion {
                model: model_name.to_string(),
                version,
            });
        }

        // Write then rename so readers never see a partial marker
        let dir = self.model_dir(model_name);
        let tmp = dir.join(format!(".{}.tmp", PROMOTION_FILE));
        let path = dir.join(PROMOTION_FILE);
        fs::write(&tmp, version.to_string()).map_err(|e| io_err(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;

        tracing::info!("Promoted '{}' version {} to production", model_name, version);
        Ok(())
    }

    /// Promote the highest registered version
    pub fn promote_latest(&self, model_name: &str) -> Result<u64, RegistryError> {
        let latest = self
            .list_versions(model_name)?
            .last()
            .copied()
            .ok_or_else(|| RegistryError::NoVersions(model_name.to_string()))?;
        self.promote(model_name, latest)?;
        Ok(latest)
    }
}

impl ModelRegistry for FsRegistry {
    fn list_versions(&self, model_name: &str) -> Result<Vec<u64>, RegistryError> {
        let dir = self.model_dir(model_name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&dir, e)),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&dir, e))?;
            let Some(version) = entry.file_name().to_str().and_then(|n| n.parse::<u64>().ok())
            else {
                continue;
            };
            if entry.path().join(ARTIFACT_FILE).is_file() {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn promoted_version(&self, model_name: &str) -> Result<Option<u64>, RegistryError> {
        let path = self.model_dir(model_name).join(PROMOTION_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path, e)),
        };

        content
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| RegistryError::BadPromotion {
                path,
                content: content.trim().to_string(),
            })
    }

    fn fetch_artifact(&self, model_name: &str, version: u64) -> Result<Vec<u8>, RegistryError> {
        let path = self
            .model_dir(model_name)
            .join(version.to_string())
            .join(ARTIFACT_FILE);
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RegistryError::UnknownVersion {
                model: model_name.to_string(),
                version,
            },
            _ => io_err(&path, e),
        })
    }
}

fn io_err(path: &Path, source: io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "iris-classifier";

    #[test]
    fn test_empty_registry_has_no_versions() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FsRegistry::new(dir.path());

        assert!(registry.list_versions(MODEL).unwrap().is_empty());
        assert_eq!(registry.promoted_version(MODEL).unwrap(), None);
        assert!(matches!(
            resolve_version(&registry, MODEL),
            Err(RegistryError::NoVersions(_))
        ));
    }

    #[test]
    fn test_register_assigns_increasing_versions() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FsRegistry::new(dir.path());

        assert_eq!(registry.register(MODEL, b"{}").unwrap(), 1);
        assert_eq!(registry.register(MODEL, b"{}").unwrap(), 2);
        assert_eq!(registry.list_versions(MODEL).unwrap(), vec![1, 2]);
        assert_eq!(registry.fetch_artifact(MODEL, 2).unwrap(), b"{}".to_vec());
    }

    #[test]
    fn test_resolve_prefers_promoted_over_latest() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FsRegistry::new(dir.path());
        for _ in 0..3 {
            registry.register(MODEL, b"{}").unwrap();
        }

        assert_eq!(resolve_version(&registry, MODEL).unwrap(), (3, false));

        registry.promote(MODEL, 2).unwrap();
        assert_eq!(registry.promoted_version(MODEL).unwrap(), Some(2));
        assert_eq!(resolve_version(&registry, MODEL).unwrap(), (2, true));
    }

    #[test]
    fn test_promote_unknown_version_fails() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FsRegistry::new(dir.path());
        registry.register(MODEL, b"{}").unwrap();

        assert!(matches!(
            registry.promote(MODEL, 7),
            Err(RegistryError::UnknownVersion { version: 7, .. })
        ));
    }

    #[test]
    fn test_promote_latest() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FsRegistry::new(dir.path());
        registry.register(MODEL, b"{}").unwrap();
        registry.register(MODEL, b"{}").unwrap();

        assert_eq!(registry.promote_latest(MODEL).unwrap(), 2);
        assert_eq!(resolve_version(&registry, MODEL).unwrap(), (2, true));
    }

    #[test]
    fn test_stale_promotion_falls_back_to_latest() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FsRegistry::new(dir.path());
        registry.register(MODEL, b"{}").unwrap();
        fs::write(dir.path().join(MODEL).join(PROMOTION_FILE), "9").unwrap();

        assert_eq!(resolve_version(&registry, MODEL).unwrap(), (1, false));
    }

    #[test]
    fn test_garbage_promotion_marker_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FsRegistry::new(dir.path());
        registry.register(MODEL, b"{}").unwrap();
        fs::write(dir.path().join(MODEL).join(PROMOTION_FILE), "latest").unwrap();

        assert!(matches!(
            registry.promoted_version(MODEL),
            Err(RegistryError::BadPromotion { .. })
        ));
    }

    #[test]
    fn test_ignores_non_version_entries() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FsRegistry::new(dir.path());
        registry.register(MODEL, b"{}").unwrap();
        fs::create_dir_all(dir.path().join(MODEL).join("scratch")).unwrap();
        fs::create_dir_all(dir.path().join(MODEL).join("5")).unwrap();

        assert_eq!(registry.list_versions(MODEL).unwrap(), vec![1]);
    }
}
