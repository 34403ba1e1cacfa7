//! HTTP fetch pipeline for the offline cache engine.
//!
//! ### Status Passthrough
//! - Every HTTP status (200, 206, 404, ...) is a response, not an error.
//!   The engine decides what is cacheable.
//! - Only transport failures, timeouts, and oversized bodies are errors.
//!
//! ### Limits
//! - Max redirects: 5 (configurable)
//! - Max body bytes: 512MB (configurable)

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::{Client, StatusCode, header};
use url::Url;

use vidcache_core::{Error, StoredEntry};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "vidcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 512MB)
    pub max_bytes: usize,

    /// Request timeout (default: 120s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "vidcache/0.1".to_string(),
            max_bytes: 512 * 1024 * 1024,
            timeout: Duration::from_secs(120),
            max_redirects: 5,
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Build a response without a network round trip.
    pub fn synthetic(url: Url, status: StatusCode, content_type: Option<&str>, bytes: impl Into<Bytes>) -> Self {
        let mut headers = header::HeaderMap::new();
        if let Some(value) = content_type.and_then(|ct| header::HeaderValue::from_str(ct).ok()) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        Self {
            final_url: url.clone(),
            url,
            status,
            content_type: content_type.map(str::to_string),
            bytes: bytes.into(),
            headers,
            fetch_ms: 0,
        }
    }

    /// Whether the response is complete and may be stored.
    pub fn is_cacheable(&self) -> bool {
        vidcache_core::store::is_cacheable_status(self.status.as_u16())
    }

    /// Headers as owned name/value pairs; non-UTF-8 values are dropped.
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect()
    }

    /// Snapshot this response as a store entry keyed by `key`.
    pub fn to_entry(&self, key: &str) -> StoredEntry {
        StoredEntry {
            url: key.to_string(),
            status: self.status.as_u16(),
            content_type: self.content_type.clone(),
            headers: self.header_pairs(),
            body: self.bytes.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Network boundary the engine fetches through.
///
/// This allows tests and alternate transports to stand in for reqwest
/// without changing strategy code.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Fetch a URL. Any HTTP status is `Ok`; only transport failures are errors.
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, Error>;
}

/// HTTP fetch client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn map_send_error(err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(err.to_string())
        } else {
            Error::Network(format!("network error: {}", err))
        }
    }
}

#[async_trait::async_trait]
impl Network for FetchClient {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .get(url.as_str())
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(Self::map_send_error)?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            status = status.as_u16(),
            bytes = bytes.len(),
            fetch_ms,
            "fetched {} -> {}",
            url,
            final_url
        );

        Ok(FetchResponse { url: url.clone(), final_url, status, content_type, bytes, headers, fetch_ms })
    }
}
