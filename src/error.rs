//! Error taxonomy.
//!
//! Errors that only affect cache freshness (write failures, generation delete
//! failures) are absorbed where they occur and surface only as log output;
//! errors that mean no content can be produced at all propagate to the caller.

use std::path::PathBuf;

use thiserror::Error;

use crate::lifecycle::LifecycleState;

/// Configuration problems detected at construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config: {0}")]
  Parse(#[from] serde_yaml::Error),

  #[error("cache generation name must not be empty")]
  EmptyGeneration,

  #[error("offline fallback {0:?} is not listed in the precache manifest")]
  FallbackNotInManifest(String),

  #[error("manifest entry {identifier:?} does not resolve against the origin: {source}")]
  InvalidManifestEntry {
    identifier: String,
    #[source]
    source: url::ParseError,
  },
}

/// Cache store failures.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("cache database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error("failed to encode cache entry: {0}")]
  Encode(#[from] serde_json::Error),

  #[error("cache store lock poisoned")]
  LockPoisoned,

  #[error("could not determine a data directory for the cache database")]
  NoDataDir,

  #[error("failed to create cache directory {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("stored entry is corrupt: {0}")]
  Corrupt(String),
}

/// Transport-level fetch failures. The fallback chains treat every variant
/// identically; the distinction exists for logging.
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
  #[error("request timed out")]
  Timeout,

  #[error("connection failed: {0}")]
  Connect(String),

  #[error("request aborted")]
  Aborted,

  #[error("network error: {0}")]
  Other(String),
}

/// Install-time precache failures. Fatal to that install attempt only.
#[derive(Debug, Error)]
pub enum PrecacheError {
  #[error("failed to precache {identifier:?}: {reason}")]
  ManifestFetchFailed { identifier: String, reason: String },

  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Lifecycle transition failures.
#[derive(Debug, Error)]
pub enum LifecycleError {
  #[error("{operation} is not valid in state {state:?}")]
  InvalidState {
    operation: &'static str,
    state: LifecycleState,
  },

  #[error(transparent)]
  Precache(#[from] PrecacheError),
}

/// Request resolution failures surfaced to the interception boundary.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// The controller is not serving yet.
  #[error("cache is not active yet (state {0:?})")]
  NotActive(LifecycleState),

  /// Network failed and neither the request nor the offline fallback is
  /// cached. The boundary must supply its own last-resort response.
  #[error("offline with no cached content and no offline fallback")]
  NoOfflineContent,
}
