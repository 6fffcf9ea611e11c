//! Network transport: the fetch collaborator behind the cache.

use std::future::Future;
use std::time::Duration;

use crate::error::NetworkError;
use crate::http::{Method, OriginKind, Request, Response};

/// Trait for the network side of request resolution.
///
/// Every fetch is a suspension point; callers are never blocked by another
/// request's I/O. A transport-level abort is reported as an ordinary
/// [`NetworkError`]; there is no distinguished cancellation path.
pub trait NetworkTransport: Send + Sync {
  fn fetch(
    &self,
    request: &Request,
  ) -> impl Future<Output = Result<Response, NetworkError>> + Send;
}

/// Default transport backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  /// Build a transport with a 30 second request timeout.
  pub fn new() -> Result<Self, NetworkError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(|e| NetworkError::Other(e.to_string()))?;

    Ok(Self { client })
  }

  /// Wrap an existing client (custom timeouts, proxies, TLS setup).
  pub fn with_client(client: reqwest::Client) -> Self {
    Self { client }
  }
}

impl NetworkTransport for HttpTransport {
  fn fetch(
    &self,
    request: &Request,
  ) -> impl Future<Output = Result<Response, NetworkError>> + Send {
    let mut builder = self
      .client
      .request(to_reqwest_method(request.method), request.url.clone());
    for (name, value) in &request.headers {
      builder = builder.header(name, value);
    }
    let request_origin = request.url.origin();

    async move {
      let response = builder.send().await.map_err(map_error)?;

      let status = response.status().as_u16();
      // A fetch that ended up on another origin (redirect) is opaque: its
      // status cannot be trusted to describe the requested resource.
      let origin_kind = if response.url().origin() == request_origin {
        OriginKind::Basic
      } else {
        OriginKind::Opaque
      };
      let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
          (
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
          )
        })
        .collect();

      let body = response.bytes().await.map_err(map_error)?.to_vec();

      Ok(Response {
        status,
        headers,
        body,
        origin_kind,
      })
    }
  }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
  match method {
    Method::Get => reqwest::Method::GET,
    Method::Head => reqwest::Method::HEAD,
    Method::Post => reqwest::Method::POST,
    Method::Put => reqwest::Method::PUT,
    Method::Delete => reqwest::Method::DELETE,
    Method::Patch => reqwest::Method::PATCH,
    Method::Options => reqwest::Method::OPTIONS,
  }
}

fn map_error(err: reqwest::Error) -> NetworkError {
  if err.is_timeout() {
    NetworkError::Timeout
  } else if err.is_connect() {
    NetworkError::Connect(err.to_string())
  } else {
    NetworkError::Other(err.to_string())
  }
}
