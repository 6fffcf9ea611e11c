//! Shared test doubles and fixtures.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use url::Url;

use crate::error::NetworkError;
use crate::http::{OriginKind, Response};
use crate::transport::NetworkTransport;

/// Route engine logs to the test writer; filter with RUST_LOG.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

pub fn url(s: &str) -> Url {
  Url::parse(s).unwrap()
}

/// A 200 text/html response from the request's own origin.
pub fn html(body: &str) -> Response {
  Response {
    status: 200,
    headers: vec![("content-type".into(), "text/html; charset=utf-8".into())],
    body: body.as_bytes().to_vec(),
    origin_kind: OriginKind::Basic,
  }
}

pub fn with_status(mut response: Response, status: u16) -> Response {
  response.status = status;
  response
}

/// A 200 response that crossed origins.
pub fn opaque(body: &[u8]) -> Response {
  Response {
    status: 200,
    headers: vec![],
    body: body.to_vec(),
    origin_kind: OriginKind::Opaque,
  }
}

/// Scripted transport: URLs map to canned responses, anything unrouted (or
/// everything, after `go_offline`) fails like a dead network. Counts fetches
/// so tests can assert the network was or wasn't consulted.
pub struct FakeTransport {
  routes: Mutex<HashMap<String, Response>>,
  offline: Mutex<bool>,
  calls: AtomicUsize,
}

impl FakeTransport {
  pub fn new() -> Self {
    Self {
      routes: Mutex::new(HashMap::new()),
      offline: Mutex::new(false),
      calls: AtomicUsize::new(0),
    }
  }

  /// Route `url` to a canned response.
  pub fn respond(&self, url: &str, response: Response) {
    self.routes.lock().unwrap().insert(url.to_string(), response);
  }

  /// Make every subsequent fetch fail, routed or not.
  pub fn go_offline(&self) {
    *self.offline.lock().unwrap() = true;
  }

  /// Number of fetches attempted so far.
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl NetworkTransport for FakeTransport {
  fn fetch(
    &self,
    request: &crate::http::Request,
  ) -> impl Future<Output = Result<Response, NetworkError>> + Send {
    self.calls.fetch_add(1, Ordering::SeqCst);

    let offline = *self.offline.lock().unwrap();
    let result = if offline {
      Err(NetworkError::Connect("network unreachable".into()))
    } else {
      self
        .routes
        .lock()
        .unwrap()
        .get(request.url.as_str())
        .cloned()
        .ok_or_else(|| NetworkError::Connect("connection refused".into()))
    };

    async move { result }
  }
}
