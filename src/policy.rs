//! Request resolution: the two fetch strategies over one engine.
//!
//! One engine serves both policies, selected once per deployment:
//!
//! - **NetworkFirst** favors freshness: always try the network, fall back to
//!   the cache (then the offline fallback) when it fails.
//! - **CacheFirst** favors latency and offline robustness: serve a hit
//!   without touching the network, fill the cache on a validated miss.
//!
//! Cache writes after a response are fire-and-forget tasks; a write failure
//! is observable only in the logs and never affects the caller's response.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::http::{CacheKey, Method, OriginKind, Request, Response};
use crate::store::{CacheStore, CachedResponse};
use crate::transport::NetworkTransport;

/// Which resolution strategy a deployment runs. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
  #[default]
  NetworkFirst,
  CacheFirst,
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
  /// Fresh from the network.
  Network,
  /// A cached entry for the request itself.
  Cache,
  /// The configured offline fallback entry.
  OfflineFallback,
  /// Synthesized locally because the network failed and nothing was cached.
  Synthesized,
}

/// A response produced by the engine, tagged with its provenance.
#[derive(Debug, Clone)]
pub struct Served {
  pub response: Response,
  pub source: ResponseSource,
}

/// Outcome of resolving one request.
#[derive(Debug, Clone)]
pub enum Resolution {
  /// The engine produced a response.
  Response(Served),
  /// The engine declines this request (non-GET); the host should perform its
  /// own default fetch. The engine has touched neither cache nor network.
  PassThrough,
}

/// The resolution engine: applies the configured strategy to one request at a
/// time, updating the cache as a side effect.
///
/// `resolve` takes `&self`; any number of requests may be in flight at once.
/// All serialization is delegated to the store.
pub struct ResolutionEngine<S, T> {
  store: Arc<S>,
  transport: Arc<T>,
  generation: String,
  offline_fallback: CacheKey,
  strategy: Strategy,
}

impl<S, T> ResolutionEngine<S, T>
where
  S: CacheStore + 'static,
  T: NetworkTransport,
{
  pub fn new(
    store: Arc<S>,
    transport: Arc<T>,
    generation: String,
    offline_fallback: CacheKey,
    strategy: Strategy,
  ) -> Self {
    Self {
      store,
      transport,
      generation,
      offline_fallback,
      strategy,
    }
  }

  /// Resolve one request according to the configured strategy.
  pub async fn resolve(&self, request: &Request) -> Result<Resolution, ResolveError> {
    // Only GET traffic is cacheable; everything else is the host's problem.
    if request.method != Method::Get {
      debug!(method = %request.method, url = %request.url, "declining non-GET request");
      return Ok(Resolution::PassThrough);
    }

    let served = match self.strategy {
      Strategy::NetworkFirst => self.network_first(request).await?,
      Strategy::CacheFirst => self.cache_first(request).await?,
    };

    Ok(Resolution::Response(served))
  }

  async fn network_first(&self, request: &Request) -> Result<Served, ResolveError> {
    let key = request.cache_key();

    match self.transport.fetch(request).await {
      Ok(response) => {
        // Freshness policy: keep whatever the network said, even errors, so
        // the newest known state of the resource is available offline.
        self.store_in_background(&key, &response);
        Ok(Served {
          response,
          source: ResponseSource::Network,
        })
      }
      Err(err) => {
        debug!(key = %key, error = %err, "network failed, trying cache");

        if let Some(cached) = self.lookup(&key) {
          debug!(key = %key, generation = %cached.generation, "serving cached response");
          return Ok(Served {
            response: cached.response,
            source: ResponseSource::Cache,
          });
        }

        if let Some(fallback) = self.lookup(&self.offline_fallback) {
          debug!(key = %key, "serving offline fallback");
          return Ok(Served {
            response: fallback.response,
            source: ResponseSource::OfflineFallback,
          });
        }

        Err(ResolveError::NoOfflineContent)
      }
    }
  }

  async fn cache_first(&self, request: &Request) -> Result<Served, ResolveError> {
    let key = request.cache_key();

    if let Some(cached) = self.lookup(&key) {
      debug!(key = %key, generation = %cached.generation, "cache hit");
      return Ok(Served {
        response: cached.response,
        source: ResponseSource::Cache,
      });
    }

    match self.transport.fetch(request).await {
      Ok(response) => {
        if is_cacheable(&response) {
          self.store_in_background(&key, &response);
        } else {
          debug!(
            key = %key,
            status = response.status,
            origin_kind = response.origin_kind.as_str(),
            "response not cacheable"
          );
        }
        Ok(Served {
          response,
          source: ResponseSource::Network,
        })
      }
      Err(err) => {
        debug!(key = %key, error = %err, "offline and not cached");
        Ok(Served {
          response: offline_placeholder(),
          source: ResponseSource::Synthesized,
        })
      }
    }
  }

  /// Cache lookup with failures degraded to misses.
  fn lookup(&self, key: &CacheKey) -> Option<CachedResponse> {
    match self.store.lookup(key) {
      Ok(hit) => hit,
      Err(err) => {
        warn!(key = %key, error = %err, "cache lookup failed, treating as miss");
        None
      }
    }
  }

  /// Best-effort cache write on a spawned task. The response has usually
  /// already been handed to the caller by the time this runs.
  fn store_in_background(&self, key: &CacheKey, response: &Response) {
    let store = Arc::clone(&self.store);
    let generation = self.generation.clone();
    let key = key.clone();
    let response = response.clone();

    tokio::spawn(async move {
      if let Err(err) = store.put(&generation, &key, &response) {
        warn!(key = %key, generation = %generation, error = %err, "cache write failed");
      }
    });
  }
}

/// A fill is only trusted when the origin itself answered with a success:
/// opaque cross-origin responses can mask error pages.
fn is_cacheable(response: &Response) -> bool {
  response.is_success() && response.origin_kind == OriginKind::Basic
}

/// Terminal response for a cache-first request that is offline and uncached.
fn offline_placeholder() -> Response {
  Response {
    status: 503,
    headers: vec![(
      "content-type".to_string(),
      "text/plain; charset=utf-8".to_string(),
    )],
    body: b"You are offline and the resource is not cached.".to_vec(),
    origin_kind: OriginKind::Basic,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;
  use crate::testutil::{html, opaque, url, with_status, FakeTransport};
  use std::time::Duration;

  const GENERATION: &str = "app-cache-v1";
  const FALLBACK_URL: &str = "https://example.com/offline.html";

  fn engine(
    store: Arc<MemoryStore>,
    transport: Arc<FakeTransport>,
    strategy: Strategy,
  ) -> ResolutionEngine<MemoryStore, FakeTransport> {
    let fallback = CacheKey::new(Method::Get, &url(FALLBACK_URL));
    ResolutionEngine::new(store, transport, GENERATION.to_string(), fallback, strategy)
  }

  fn served(resolution: Resolution) -> Served {
    match resolution {
      Resolution::Response(served) => served,
      Resolution::PassThrough => panic!("expected a response, got pass-through"),
    }
  }

  /// Let the fire-and-forget write task run.
  async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
  }

  #[tokio::test]
  async fn test_non_get_passes_through_untouched() {
    for strategy in [Strategy::NetworkFirst, Strategy::CacheFirst] {
      let store = Arc::new(MemoryStore::new());
      let transport = Arc::new(FakeTransport::new());
      let engine = engine(Arc::clone(&store), Arc::clone(&transport), strategy);

      let mut request = Request::get(url("https://example.com/api"));
      request.method = Method::Post;

      let resolution = engine.resolve(&request).await.unwrap();
      assert!(matches!(resolution, Resolution::PassThrough));
      assert_eq!(transport.calls(), 0);
      assert!(store.list_generations().unwrap().is_empty());
    }
  }

  #[tokio::test]
  async fn test_network_first_serves_and_caches_network_success() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(FakeTransport::new());
    transport.respond("https://example.com/page", html("fresh"));
    let engine = engine(Arc::clone(&store), transport, Strategy::NetworkFirst);

    let request = Request::get(url("https://example.com/page"));
    let served = served(engine.resolve(&request).await.unwrap());

    assert_eq!(served.source, ResponseSource::Network);
    assert_eq!(served.response.body, b"fresh");

    settle().await;
    let hit = store.lookup(&request.cache_key()).unwrap().unwrap();
    assert_eq!(hit.response.body, b"fresh");
    assert_eq!(hit.generation, GENERATION);
  }

  #[tokio::test]
  async fn test_network_first_caches_regardless_of_status() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(FakeTransport::new());
    transport.respond("https://example.com/gone", with_status(html("gone"), 404));
    let engine = engine(Arc::clone(&store), transport, Strategy::NetworkFirst);

    let request = Request::get(url("https://example.com/gone"));
    let served = served(engine.resolve(&request).await.unwrap());
    assert_eq!(served.response.status, 404);

    settle().await;
    assert!(store.lookup(&request.cache_key()).unwrap().is_some());
  }

  #[tokio::test]
  async fn test_network_first_falls_back_to_cached_entry_verbatim() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(FakeTransport::new());
    let engine = engine(Arc::clone(&store), transport, Strategy::NetworkFirst);

    let request = Request::get(url("https://example.com/page"));
    let stored = html("stored bytes");
    store
      .put(GENERATION, &request.cache_key(), &stored)
      .unwrap();

    // Transport has no route for the URL: every fetch fails.
    let served = served(engine.resolve(&request).await.unwrap());
    assert_eq!(served.source, ResponseSource::Cache);
    assert_eq!(served.response, stored);
  }

  #[tokio::test]
  async fn test_network_first_falls_back_to_offline_page() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(FakeTransport::new());
    let engine = engine(Arc::clone(&store), transport, Strategy::NetworkFirst);

    let fallback_key = CacheKey::new(Method::Get, &url(FALLBACK_URL));
    store.put(GENERATION, &fallback_key, &html("offline page")).unwrap();

    let request = Request::get(url("https://example.com/never-seen"));
    let served = served(engine.resolve(&request).await.unwrap());

    assert_eq!(served.source, ResponseSource::OfflineFallback);
    assert_eq!(served.response.body, b"offline page");
  }

  #[tokio::test]
  async fn test_network_first_with_nothing_cached_is_an_error() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(FakeTransport::new());
    let engine = engine(store, transport, Strategy::NetworkFirst);

    let request = Request::get(url("https://example.com/never-seen"));
    let err = engine.resolve(&request).await.unwrap_err();
    assert!(matches!(err, ResolveError::NoOfflineContent));
  }

  #[tokio::test]
  async fn test_cache_first_hit_skips_the_network() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(FakeTransport::new());
    transport.respond("https://example.com/page", html("from network"));
    let engine = engine(Arc::clone(&store), Arc::clone(&transport), Strategy::CacheFirst);

    let request = Request::get(url("https://example.com/page"));
    store
      .put(GENERATION, &request.cache_key(), &html("from cache"))
      .unwrap();

    let served = served(engine.resolve(&request).await.unwrap());
    assert_eq!(served.source, ResponseSource::Cache);
    assert_eq!(served.response.body, b"from cache");
    assert_eq!(transport.calls(), 0);
  }

  #[tokio::test]
  async fn test_cache_first_fills_on_miss_then_serves_from_cache() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(FakeTransport::new());
    transport.respond("https://example.com/data.json", html("payload"));
    let engine = engine(Arc::clone(&store), Arc::clone(&transport), Strategy::CacheFirst);

    let request = Request::get(url("https://example.com/data.json"));

    let first = served(engine.resolve(&request).await.unwrap());
    assert_eq!(first.source, ResponseSource::Network);
    assert_eq!(transport.calls(), 1);

    settle().await;

    let second = served(engine.resolve(&request).await.unwrap());
    assert_eq!(second.source, ResponseSource::Cache);
    assert_eq!(second.response.body, b"payload");
    // No second network call.
    assert_eq!(transport.calls(), 1);
  }

  #[tokio::test]
  async fn test_cache_first_never_caches_opaque_responses() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(FakeTransport::new());
    transport.respond("https://example.com/widget.js", opaque(b"tracked"));
    let engine = engine(Arc::clone(&store), transport, Strategy::CacheFirst);

    let request = Request::get(url("https://example.com/widget.js"));
    let served = served(engine.resolve(&request).await.unwrap());

    assert_eq!(served.source, ResponseSource::Network);
    assert_eq!(served.response.body, b"tracked");

    settle().await;
    assert!(store.lookup(&request.cache_key()).unwrap().is_none());
  }

  #[tokio::test]
  async fn test_cache_first_never_caches_error_statuses() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(FakeTransport::new());
    transport.respond("https://example.com/missing", with_status(html("nope"), 404));
    let engine = engine(Arc::clone(&store), transport, Strategy::CacheFirst);

    let request = Request::get(url("https://example.com/missing"));
    let served = served(engine.resolve(&request).await.unwrap());
    assert_eq!(served.response.status, 404);

    settle().await;
    assert!(store.lookup(&request.cache_key()).unwrap().is_none());
  }

  #[tokio::test]
  async fn test_cache_first_synthesizes_offline_response() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(FakeTransport::new());
    let engine = engine(store, transport, Strategy::CacheFirst);

    let request = Request::get(url("https://example.com/never-seen"));
    let served = served(engine.resolve(&request).await.unwrap());

    assert_eq!(served.source, ResponseSource::Synthesized);
    assert_eq!(served.response.status, 503);
    assert_eq!(
      served.response.body,
      b"You are offline and the resource is not cached."
    );
  }

  #[tokio::test]
  async fn test_cached_entry_is_not_mutated_by_hits() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(FakeTransport::new());
    let engine = engine(Arc::clone(&store), transport, Strategy::CacheFirst);

    let request = Request::get(url("https://example.com/page"));
    let stored = html("immutable");
    store
      .put(GENERATION, &request.cache_key(), &stored)
      .unwrap();

    for _ in 0..3 {
      let served = served(engine.resolve(&request).await.unwrap());
      assert_eq!(served.response, stored);
    }
  }
}
