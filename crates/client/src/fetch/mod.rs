//! Network side of the proxy.
//!
//! ### Requests
//! - Targets are resolved against the application origin and stripped of
//!   fragments, so the same resource always maps to one cache key.
//! - Documents are fetched with `Cache-Control: no-store` and same-origin
//!   credentials; credential headers are dropped for cross-origin targets.
//!
//! ### Responses
//! - Any HTTP status is a successful fetch. Only connection failures and
//!   timeouts are errors; strategies decide what an error status means.
//! - Bodies are never decoded. A `Content-Encoding` response is handed back
//!   and stored as sent, with its headers intact.
//!
//! ### Seam
//! - Strategies talk to the network through the [`Network`] trait so the
//!   transport can be swapped (reqwest in production, scripted stubs in tests).

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use std::time::{Duration, Instant};

pub use self::url::{UrlError, resolve};

use waypoint_core::{CacheEntry, Error};

/// HTTP cache behavior requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Default,
    /// Bypass any intermediate HTTP cache.
    NoStore,
}

/// Which targets may receive credential headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    #[default]
    Include,
    SameOrigin,
}

/// An outbound request as issued by the application.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub method: Method,
    pub url: ::url::Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub cache_mode: CacheMode,
    pub credentials: Credentials,
}

impl ResourceRequest {
    pub fn new(method: Method, mut url: ::url::Url) -> Self {
        url.set_fragment(None);
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            cache_mode: CacheMode::Default,
            credentials: Credentials::Include,
        }
    }

    pub fn get(url: ::url::Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Where a response handed back to the caller came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    /// Built locally as a fallback (offline page, empty image, ...).
    Synthesized,
}

/// A response returned to the application.
#[derive(Debug, Clone)]
pub struct ResourceResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl ResourceResponse {
    /// A locally built response with a plain-text body.
    pub fn synthesized(status: StatusCode, body: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        if !body.is_empty() {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        }
        Self { status, headers, body: Bytes::from_static(body.as_bytes()), source: ResponseSource::Synthesized }
    }

    /// Rebuild a response from a stored entry. Headers that are no longer
    /// valid HTTP are skipped.
    pub fn from_entry(entry: CacheEntry) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in &entry.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }
        Self {
            status: StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK),
            headers,
            body: Bytes::from(entry.body),
            source: ResponseSource::Cache,
        }
    }

    /// Snapshot this response for storage under `url`.
    pub fn to_entry(&self, url: &::url::Url) -> CacheEntry {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        CacheEntry::capture(url.as_str(), self.status.as_u16(), headers, self.body.to_vec())
    }

    /// The declared `Content-Length`, if present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }
}

/// Transport used by every strategy.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform one network attempt. Errors are connection failures only.
    async fn fetch(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error>;
}

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "waypoint/0.1")
    pub user_agent: String,

    /// Maximum number of redirects to follow (default: 10)
    pub max_redirects: usize,

    /// Application origin used for same-origin credential checks.
    pub origin: Option<::url::Url>,

    /// Connect timeout; total request time is bounded by the strategies.
    pub connect_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "waypoint/0.1".to_string(),
            max_redirects: 10,
            origin: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// reqwest-backed [`Network`].
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new transport with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            // Encoded bodies pass through untouched so Content-Length keeps its declared size.
            .no_gzip()
            .no_brotli()
            .no_deflate()
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn is_cross_origin(&self, url: &::url::Url) -> bool {
        self.config
            .origin
            .as_ref()
            .is_some_and(|origin| origin.origin() != url.origin())
    }

    /// Headers actually sent for `request`.
    fn outbound_headers(&self, request: &ResourceRequest) -> HeaderMap {
        let mut headers = request.headers.clone();
        if request.cache_mode == CacheMode::NoStore {
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        }
        if request.credentials == Credentials::SameOrigin && self.is_cross_origin(&request.url) {
            headers.remove(header::COOKIE);
            headers.remove(header::AUTHORIZATION);
        }
        headers
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
        let start = Instant::now();

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .headers(self.outbound_headers(request));
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{}: {}", request.url, e))
            } else {
                Error::HttpError(format!("network error: {}", e))
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(ResourceResponse { status, headers, body, source: ResponseSource::Network })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_url(path: &str) -> ::url::Url {
        ::url::Url::parse("https://app.test").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "waypoint/0.1");
        assert_eq!(config.max_redirects, 10);
        assert!(config.origin.is_none());
    }

    #[test]
    fn test_request_strips_fragment() {
        let request = ResourceRequest::get(app_url("/about#team"));
        assert_eq!(request.url.as_str(), "https://app.test/about");
        assert_eq!(request.method, Method::GET);
    }

    #[test]
    fn test_entry_round_trip_keeps_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/css"));
        let response = ResourceResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(b"a{}"),
            source: ResponseSource::Network,
        };

        let entry = response.to_entry(&app_url("/site.css"));
        assert_eq!(entry.url, "https://app.test/site.css");
        assert_eq!(entry.size_bytes, 3);

        let restored = ResourceResponse::from_entry(entry);
        assert_eq!(restored.source, ResponseSource::Cache);
        assert_eq!(restored.headers.get(header::CONTENT_TYPE).unwrap(), "text/css");
        assert_eq!(restored.body, Bytes::from_static(b"a{}"));
    }

    #[test]
    fn test_content_length() {
        let mut response = ResourceResponse::synthesized(StatusCode::OK, "");
        assert_eq!(response.content_length(), None);
        response
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from_static("600000"));
        assert_eq!(response.content_length(), Some(600_000));
    }

    #[test]
    fn test_synthesized_offline() {
        let response = ResourceResponse::synthesized(StatusCode::SERVICE_UNAVAILABLE, "Offline");
        assert_eq!(response.status.as_u16(), 503);
        assert_eq!(response.body, Bytes::from_static(b"Offline"));
        assert_eq!(response.source, ResponseSource::Synthesized);
    }

    #[test]
    fn test_same_origin_credentials_stripped_cross_origin() {
        let network = HttpNetwork::new(FetchConfig {
            origin: Some(::url::Url::parse("https://app.test").unwrap()),
            ..Default::default()
        })
        .unwrap();

        let mut request = ResourceRequest::get(::url::Url::parse("https://tracker.test/").unwrap())
            .with_header(header::COOKIE, HeaderValue::from_static("sid=1"));
        request.credentials = Credentials::SameOrigin;
        request.cache_mode = CacheMode::NoStore;

        let headers = network.outbound_headers(&request);
        assert!(headers.get(header::COOKIE).is_none());
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");

        request.url = app_url("/account");
        let headers = network.outbound_headers(&request);
        assert_eq!(headers.get(header::COOKIE).unwrap(), "sid=1");
    }

    #[tokio::test]
    async fn test_encoded_body_keeps_declared_length() {
        let base = crate::testing::serve_once(crate::testing::gzip_image_response(223)).await;
        let network = HttpNetwork::new(FetchConfig::default()).unwrap();

        let response = network
            .fetch(&ResourceRequest::get(base.join("/img/logo.svg").unwrap()))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_length(), Some(223));
        assert_eq!(response.headers.get(header::CONTENT_ENCODING).unwrap(), "gzip");
        assert_eq!(response.body.len(), 223);
    }

    #[tokio::test]
    async fn test_http_network_new() {
        let network = HttpNetwork::new(FetchConfig::default());
        assert!(network.is_ok());
    }
}
