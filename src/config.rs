//! Build-time cache configuration.
//!
//! The hosting environment decides the generation name, the precache
//! manifest and the resolution strategy once per deployment; nothing here is
//! runtime-mutable. Configuration can be deserialized from YAML or built
//! directly in code.

use serde::Deserialize;
use std::path::Path;
use url::Url;

use crate::error::ConfigError;
use crate::http::{CacheKey, Method};
use crate::policy::Strategy;

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Name of the cache generation this build owns (e.g. "app-cache-v3").
  pub generation: String,

  /// Origin the manifest identifiers are resolved against.
  pub origin: Url,

  /// Resource paths required for offline operation, fetched at install time.
  pub manifest: Vec<String>,

  /// Manifest entry served when the network fails and the request itself was
  /// never cached. Must appear in `manifest`.
  pub offline_fallback: String,

  #[serde(default)]
  pub strategy: Strategy,

  /// Skip the waiting hand-off and serve requests right after install.
  #[serde(default = "default_eager")]
  pub eager_activation: bool,
}

fn default_eager() -> bool {
  true
}

impl CacheConfig {
  /// Load configuration from a YAML file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_yaml_str(&contents)
  }

  /// Parse configuration from a YAML string and validate it.
  pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
    let config: CacheConfig = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  /// Check the invariants the rest of the crate relies on.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.generation.is_empty() {
      return Err(ConfigError::EmptyGeneration);
    }

    if !self.manifest.iter().any(|m| m == &self.offline_fallback) {
      return Err(ConfigError::FallbackNotInManifest(
        self.offline_fallback.clone(),
      ));
    }

    for identifier in &self.manifest {
      self.resolve(identifier)?;
    }

    Ok(())
  }

  /// Resolve a manifest identifier to an absolute URL on the origin.
  pub fn resolve(&self, identifier: &str) -> Result<Url, ConfigError> {
    self
      .origin
      .join(identifier)
      .map_err(|source| ConfigError::InvalidManifestEntry {
        identifier: identifier.to_string(),
        source,
      })
  }

  /// Cache key under which the offline fallback is stored.
  pub fn offline_fallback_key(&self) -> Result<CacheKey, ConfigError> {
    let url = self.resolve(&self.offline_fallback)?;
    Ok(CacheKey::new(Method::Get, &url))
  }
}
