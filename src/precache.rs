//! Install-time population of a cache generation from the manifest.

use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::error::PrecacheError;
use crate::http::{CacheKey, Request, Response};
use crate::store::CacheStore;
use crate::transport::NetworkTransport;

/// Fetches every manifest identifier and writes the results into a named
/// generation. All-or-nothing: entries are written only after every fetch has
/// succeeded, so a failed install leaves nothing behind from this attempt.
pub struct PrecacheLoader<S, T> {
  store: Arc<S>,
  transport: Arc<T>,
}

impl<S, T> PrecacheLoader<S, T>
where
  S: CacheStore,
  T: NetworkTransport,
{
  pub fn new(store: Arc<S>, transport: Arc<T>) -> Self {
    Self { store, transport }
  }

  /// Populate `generation` with every identifier in `manifest`, resolved
  /// against `origin`.
  ///
  /// Fails with [`PrecacheError::ManifestFetchFailed`] if any identifier is
  /// unreachable or answers with a non-success status; the caller must treat
  /// that as a failed install and leave the previous generation serving.
  pub async fn precache(
    &self,
    generation: &str,
    origin: &Url,
    manifest: &[String],
  ) -> Result<(), PrecacheError> {
    self.store.open(generation)?;

    let fetches = manifest
      .iter()
      .map(|identifier| self.fetch_asset(origin, identifier));
    let assets = try_join_all(fetches).await?;

    for (key, response) in &assets {
      self.store.put(generation, key, response)?;
    }

    info!(generation, assets = assets.len(), "precache complete");
    Ok(())
  }

  async fn fetch_asset(
    &self,
    origin: &Url,
    identifier: &str,
  ) -> Result<(CacheKey, Response), PrecacheError> {
    let failed = |reason: String| PrecacheError::ManifestFetchFailed {
      identifier: identifier.to_string(),
      reason,
    };

    let url = origin.join(identifier).map_err(|e| failed(e.to_string()))?;
    let request = Request::get(url);

    let response = self
      .transport
      .fetch(&request)
      .await
      .map_err(|e| failed(e.to_string()))?;

    if !response.is_success() {
      return Err(failed(format!("status {}", response.status)));
    }

    debug!(identifier, bytes = response.body.len(), "precached asset");
    Ok((request.cache_key(), response))
  }
}
