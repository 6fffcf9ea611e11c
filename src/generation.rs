//! Cache generation lifecycle: keep the current one, destroy the rest.

use std::sync::Arc;
use tracing::{info, warn};

use crate::store::CacheStore;

/// Deletes superseded cache generations at activation time.
///
/// Deletion is best-effort: a failure to list or to delete any single
/// generation is logged and swallowed, and activation proceeds regardless.
pub struct GenerationManager<S> {
  store: Arc<S>,
}

impl<S: CacheStore> GenerationManager<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store }
  }

  /// Delete every stored generation except `current`. Idempotent.
  pub fn activate(&self, current: &str) {
    let names = match self.store.list_generations() {
      Ok(names) => names,
      Err(err) => {
        warn!(error = %err, "could not list cache generations, skipping cleanup");
        return;
      }
    };

    for name in names {
      if name == current {
        continue;
      }
      match self.store.delete_generation(&name) {
        Ok(_) => info!(generation = %name, "deleted superseded cache generation"),
        Err(err) => {
          warn!(generation = %name, error = %err, "failed to delete superseded generation")
        }
      }
    }
  }
}
