//! Storage trait and read-side result types.

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::http::{CacheKey, Response};

/// A cache hit, with metadata about where and when the entry was stored.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  /// The stored response snapshot.
  pub response: Response,
  /// Generation the entry came from.
  pub generation: String,
  /// When the entry was written.
  pub stored_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// Implementations must support concurrent use from interleaved request
/// handlers; per-key put/lookup must be atomic. The engine takes no locks of
/// its own.
pub trait CacheStore: Send + Sync {
  /// Ensure the named generation exists. Idempotent.
  fn open(&self, generation: &str) -> Result<(), StoreError>;

  /// Look up a request identity across all generations.
  ///
  /// When the key exists in more than one generation, the most recently
  /// stored entry wins.
  fn lookup(&self, key: &CacheKey) -> Result<Option<CachedResponse>, StoreError>;

  /// Store a response snapshot under `key` in the named generation,
  /// creating the generation if needed. Replaces any existing entry.
  fn put(&self, generation: &str, key: &CacheKey, response: &Response) -> Result<(), StoreError>;

  /// Names of all generations currently present.
  fn list_generations(&self) -> Result<Vec<String>, StoreError>;

  /// Delete a generation and every entry in it. Returns whether it existed.
  fn delete_generation(&self, generation: &str) -> Result<bool, StoreError>;
}
