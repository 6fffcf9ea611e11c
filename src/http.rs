//! Request and response types shared by the transport, store and policy layers.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Head,
  Post,
  Put,
  Delete,
  Patch,
  Options,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Head => "HEAD",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
      Method::Patch => "PATCH",
      Method::Options => "OPTIONS",
    }
  }
}

impl std::fmt::Display for Method {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// An inbound request as delivered by the interception boundary.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub headers: Vec<(String, String)>,
}

impl Request {
  /// Build a GET request with no extra headers.
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::Get,
      url,
      headers: Vec::new(),
    }
  }

  /// The cache identity of this request (method + URL, fragment excluded).
  pub fn cache_key(&self) -> CacheKey {
    CacheKey::new(self.method, &self.url)
  }
}

/// Whether a response came from the request's own origin or crossed origins.
///
/// Cross-origin responses are opaque: their status may mask an error page, so
/// the cache-first policy refuses to store them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginKind {
  Basic,
  Opaque,
}

impl OriginKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      OriginKind::Basic => "basic",
      OriginKind::Opaque => "opaque",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "basic" => Some(OriginKind::Basic),
      "opaque" => Some(OriginKind::Opaque),
      _ => None,
    }
  }
}

/// A response snapshot: everything the cache stores and the boundary needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  pub origin_kind: OriginKind,
}

impl Response {
  /// True for 2xx statuses.
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// First header value matching `name` (case-insensitive).
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }
}

/// Canonicalized request identity used as the cache key.
///
/// The canonical form is `"METHOD url"` with the fragment stripped; URL
/// normalization (host case, default ports, percent-encoding) is done by
/// `url::Url` parsing. The hash is a hex SHA-256 of the canonical form,
/// giving a stable fixed-width storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  canonical: String,
  hash: String,
}

impl CacheKey {
  pub fn new(method: Method, url: &Url) -> Self {
    let mut url = url.clone();
    url.set_fragment(None);

    let canonical = format!("{} {}", method.as_str(), url);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hex::encode(hasher.finalize());

    Self { canonical, hash }
  }

  /// Human-readable form, kept alongside the hash in storage.
  pub fn canonical(&self) -> &str {
    &self.canonical
  }

  /// Hex SHA-256 of the canonical form.
  pub fn hash(&self) -> &str {
    &self.hash
  }
}

impl std::fmt::Display for CacheKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.canonical)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
  }

  #[test]
  fn test_equivalent_urls_share_a_key() {
    let a = CacheKey::new(Method::Get, &url("HTTPS://Example.com:443/page"));
    let b = CacheKey::new(Method::Get, &url("https://example.com/page"));
    assert_eq!(a, b);
    assert_eq!(a.hash(), b.hash());
  }

  #[test]
  fn test_fragment_is_ignored() {
    let a = CacheKey::new(Method::Get, &url("https://example.com/page#top"));
    let b = CacheKey::new(Method::Get, &url("https://example.com/page"));
    assert_eq!(a, b);
  }

  #[test]
  fn test_query_is_part_of_the_key() {
    let a = CacheKey::new(Method::Get, &url("https://example.com/search?q=1"));
    let b = CacheKey::new(Method::Get, &url("https://example.com/search?q=2"));
    assert_ne!(a, b);
  }

  #[test]
  fn test_method_is_part_of_the_key() {
    let a = CacheKey::new(Method::Get, &url("https://example.com/page"));
    let b = CacheKey::new(Method::Head, &url("https://example.com/page"));
    assert_ne!(a, b);
  }

  #[test]
  fn test_canonical_form_is_readable() {
    let key = CacheKey::new(Method::Get, &url("https://example.com/a?x=1"));
    assert_eq!(key.canonical(), "GET https://example.com/a?x=1");
  }

  #[test]
  fn test_is_success_bounds() {
    let mut response = Response {
      status: 200,
      headers: vec![],
      body: vec![],
      origin_kind: OriginKind::Basic,
    };
    assert!(response.is_success());
    response.status = 299;
    assert!(response.is_success());
    response.status = 300;
    assert!(!response.is_success());
    response.status = 404;
    assert!(!response.is_success());
  }

  #[test]
  fn test_header_lookup_is_case_insensitive() {
    let response = Response {
      status: 200,
      headers: vec![("Content-Type".into(), "text/html".into())],
      body: vec![],
      origin_kind: OriginKind::Basic,
    };
    assert_eq!(response.header("content-type"), Some("text/html"));
    assert_eq!(response.header("x-missing"), None);
  }
}
