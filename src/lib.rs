//! Offline-first HTTP response cache.
//!
//! Sits between a client and an origin server: a fixed manifest of resources
//! is precached at install time into a named cache generation, all other GET
//! traffic is cached opportunistically, and superseded generations are
//! destroyed on activation. Per request, one of two strategies decides
//! whether to consult the network or the cache first.
//!
//! The hosting environment owns request interception, TLS and process setup;
//! it constructs a [`LifecycleController`] and drives it:
//!
//! ```no_run
//! use larder::{CacheConfig, HttpTransport, LifecycleController, Resolution, SqliteStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CacheConfig::from_yaml_str(r#"
//! generation: "app-cache-v1"
//! origin: "https://intranet.example.com"
//! manifest: ["/", "/index.html", "/offline.html"]
//! offline_fallback: "/offline.html"
//! "#)?;
//!
//! let mut cache = LifecycleController::new(config, SqliteStore::open()?, HttpTransport::new()?)?;
//! cache.install().await?;
//!
//! // per intercepted request:
//! # let request = larder::Request::get(url::Url::parse("https://intranet.example.com/")?);
//! match cache.resolve(&request).await? {
//!   Resolution::Response(served) => { /* hand served.response to the client */ }
//!   Resolution::PassThrough => { /* non-GET: do the default fetch yourself */ }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod generation;
pub mod http;
pub mod lifecycle;
pub mod policy;
pub mod precache;
pub mod store;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::CacheConfig;
pub use error::{
  ConfigError, LifecycleError, NetworkError, PrecacheError, ResolveError, StoreError,
};
pub use generation::GenerationManager;
pub use http::{CacheKey, Method, OriginKind, Request, Response};
pub use lifecycle::{LifecycleController, LifecycleState};
pub use policy::{Resolution, ResolutionEngine, ResponseSource, Served, Strategy};
pub use precache::PrecacheLoader;
pub use store::{CacheStore, CachedResponse, MemoryStore, SqliteStore};
pub use transport::{HttpTransport, NetworkTransport};
