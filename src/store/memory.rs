//! In-memory cache store.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::error::StoreError;
use crate::http::{CacheKey, Response};

use super::traits::{CacheStore, CachedResponse};

struct Entry {
  response: Response,
  stored_at: DateTime<Utc>,
}

/// Non-durable store backed by a mutex-guarded map.
///
/// Useful for hosts that don't want an on-disk database, and as the store in
/// tests. Same visibility semantics as [`super::SqliteStore`]: lookups search
/// all generations, newest entry wins.
#[derive(Default)]
pub struct MemoryStore {
  generations: Mutex<BTreeMap<String, HashMap<String, Entry>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(
    &self,
  ) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, HashMap<String, Entry>>>, StoreError> {
    self.generations.lock().map_err(|_| StoreError::LockPoisoned)
  }
}

impl CacheStore for MemoryStore {
  fn open(&self, generation: &str) -> Result<(), StoreError> {
    self.lock()?.entry(generation.to_string()).or_default();
    Ok(())
  }

  fn lookup(&self, key: &CacheKey) -> Result<Option<CachedResponse>, StoreError> {
    let generations = self.lock()?;

    let newest = generations
      .iter()
      .filter_map(|(name, entries)| entries.get(key.hash()).map(|entry| (name, entry)))
      .max_by_key(|(name, entry)| (entry.stored_at, name.clone()));

    Ok(newest.map(|(name, entry)| CachedResponse {
      response: entry.response.clone(),
      generation: name.clone(),
      stored_at: entry.stored_at,
    }))
  }

  fn put(&self, generation: &str, key: &CacheKey, response: &Response) -> Result<(), StoreError> {
    self
      .lock()?
      .entry(generation.to_string())
      .or_default()
      .insert(
        key.hash().to_string(),
        Entry {
          response: response.clone(),
          stored_at: Utc::now(),
        },
      );
    Ok(())
  }

  fn list_generations(&self) -> Result<Vec<String>, StoreError> {
    Ok(self.lock()?.keys().cloned().collect())
  }

  fn delete_generation(&self, generation: &str) -> Result<bool, StoreError> {
    Ok(self.lock()?.remove(generation).is_some())
  }
}
