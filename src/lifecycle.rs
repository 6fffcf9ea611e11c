//! Lifecycle orchestration: install, activate, resolve.
//!
//! The host's event-dispatch mechanism (however requests physically arrive)
//! maps onto three entry points: `install()` for the install signal,
//! `activate()` for the activate signal, and `resolve()` per intercepted
//! request. The controller is an explicit state machine so the transitions
//! are directly testable.

use std::sync::Arc;
use tracing::info;

use crate::config::CacheConfig;
use crate::error::{ConfigError, LifecycleError, ResolveError};
use crate::generation::GenerationManager;
use crate::http::Request;
use crate::policy::{Resolution, ResolutionEngine};
use crate::precache::PrecacheLoader;
use crate::store::CacheStore;
use crate::transport::NetworkTransport;

/// Where a controller instance is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
  Uninstalled,
  Installing,
  /// Installed and, unless eagerly activated, waiting for the activate
  /// signal (a still-active prior instance may be serving).
  Installed,
  Activating,
  Active,
}

/// Orchestrates one cache generation from install through serving.
///
/// `install` and `activate` take `&mut self` and therefore cannot overlap
/// with each other; `resolve` takes `&self` so any number of requests run
/// concurrently once serving begins.
pub struct LifecycleController<S, T> {
  config: CacheConfig,
  engine: ResolutionEngine<S, T>,
  precache: PrecacheLoader<S, T>,
  generations: GenerationManager<S>,
  state: LifecycleState,
}

impl<S, T> LifecycleController<S, T>
where
  S: CacheStore + 'static,
  T: NetworkTransport,
{
  /// Validate the configuration and wire up the components.
  pub fn new(config: CacheConfig, store: S, transport: T) -> Result<Self, ConfigError> {
    Self::with_shared(config, Arc::new(store), Arc::new(transport))
  }

  /// Like [`new`](Self::new) for hosts that already share the store or
  /// transport elsewhere.
  pub fn with_shared(
    config: CacheConfig,
    store: Arc<S>,
    transport: Arc<T>,
  ) -> Result<Self, ConfigError> {
    config.validate()?;
    let offline_fallback = config.offline_fallback_key()?;

    let engine = ResolutionEngine::new(
      Arc::clone(&store),
      Arc::clone(&transport),
      config.generation.clone(),
      offline_fallback,
      config.strategy,
    );
    let precache = PrecacheLoader::new(Arc::clone(&store), transport);
    let generations = GenerationManager::new(store);

    Ok(Self {
      config,
      engine,
      precache,
      generations,
      state: LifecycleState::Uninstalled,
    })
  }

  pub fn state(&self) -> LifecycleState {
    self.state
  }

  pub fn config(&self) -> &CacheConfig {
    &self.config
  }

  /// Handle the install signal: precache the manifest into this build's
  /// generation.
  ///
  /// A failure is fatal to this attempt only: the state returns to
  /// `Uninstalled` (a prior active instance keeps serving) and a later
  /// install may retry.
  pub async fn install(&mut self) -> Result<(), LifecycleError> {
    if self.state != LifecycleState::Uninstalled {
      return Err(LifecycleError::InvalidState {
        operation: "install",
        state: self.state,
      });
    }

    self.state = LifecycleState::Installing;
    info!(generation = %self.config.generation, "install started");

    let result = self
      .precache
      .precache(
        &self.config.generation,
        &self.config.origin,
        &self.config.manifest,
      )
      .await;

    match result {
      Ok(()) => {
        self.state = LifecycleState::Installed;
        info!(generation = %self.config.generation, "install complete");
        if self.config.eager_activation {
          self.activate()?;
        }
        Ok(())
      }
      Err(err) => {
        self.state = LifecycleState::Uninstalled;
        Err(err.into())
      }
    }
  }

  /// Handle the activate signal: destroy superseded generations and start
  /// claiming requests. By the time this returns, `resolve` is valid; no
  /// request falls between instances.
  pub fn activate(&mut self) -> Result<(), LifecycleError> {
    if self.state != LifecycleState::Installed {
      return Err(LifecycleError::InvalidState {
        operation: "activate",
        state: self.state,
      });
    }

    self.state = LifecycleState::Activating;
    self.generations.activate(&self.config.generation);
    self.state = LifecycleState::Active;
    info!(generation = %self.config.generation, "active, claiming requests");
    Ok(())
  }

  /// Resolve one intercepted request through the configured strategy.
  ///
  /// Valid once active, or right after install when `eager_activation` is
  /// set. Anything earlier is the host's mistake and gets
  /// [`ResolveError::NotActive`].
  pub async fn resolve(&self, request: &Request) -> Result<Resolution, ResolveError> {
    let ready = self.state == LifecycleState::Active
      || (self.config.eager_activation && self.state == LifecycleState::Installed);
    if !ready {
      return Err(ResolveError::NotActive(self.state));
    }

    self.engine.resolve(request).await
  }
}
