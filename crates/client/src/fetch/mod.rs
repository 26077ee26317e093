//! JSON client for the catalog API.
//!
//! ### Behaviour
//! - Paths are joined onto a configured base URL.
//! - A bearer token is attached when the injected [`TokenProvider`] yields one.
//! - Every request is bounded by a timeout (default: 10s) and never retried.
//!
//! ### Response normalization
//! - 2xx with a body: parsed JSON.
//! - 2xx with an empty body: `null`.
//! - Non-2xx: [`FetchError`] carrying the status and the body's `error` or
//!   `message` field, falling back to `HTTP <status>`.
//! - No response: [`FetchError`] without a status.

pub mod error;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use serde_json::Value;

pub use error::FetchError;

use storefront_core::AppConfig;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "storefront-cache/0.1";

/// Supplies the bearer token for outgoing requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Option<String>;
}

/// A fixed token, or none.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Option<String> {
        self.0.clone().filter(|t| !t.is_empty())
    }
}

/// Fetcher configuration.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// API host, e.g. `https://shop.example.com`.
    pub base_url: String,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    /// User-agent string (default: storefront-cache/0.1).
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl From<&AppConfig> for FetcherConfig {
    fn from(config: &AppConfig) -> Self {
        Self { base_url: config.api_base_url.clone(), timeout: config.timeout(), user_agent: config.user_agent.clone() }
    }
}

/// Per-request options.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { method: Method::GET, body: None, headers: Vec::new(), query: Vec::new() }
    }
}

impl RequestOptions {
    pub fn method(method: Method) -> Self {
        Self { method, ..Default::default() }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// HTTP client for the catalog API.
#[derive(Clone)]
pub struct RemoteFetcher {
    http: Client,
    config: FetcherConfig,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for RemoteFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFetcher").field("config", &self.config).finish_non_exhaustive()
    }
}

impl RemoteFetcher {
    /// Create a new fetcher with the given configuration and token source.
    pub fn new(config: FetcherConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::new(None, format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config, tokens })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Absolute URL for an API path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// Issue one request and normalize the outcome.
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, FetchError> {
        let start = Instant::now();
        let url = self.url_for(path);
        let method = options.method.clone();

        let mut request = self
            .http
            .request(options.method, &url)
            .header(header::ACCEPT, "application/json");

        if let Some(token) = self.tokens.token().await {
            request = request.bearer_auth(token);
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await.inspect_err(|e| {
            tracing::warn!(%method, %url, error = %e, "catalog API request failed");
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            tracing::warn!(%method, %url, status = status.as_u16(), error = %e, "failed to read catalog API response");
            FetchError::from(e).with_status(status.as_u16())
        })?;

        tracing::debug!(
            "{} {} -> {} in {:?} ({} bytes)",
            method,
            url,
            status.as_u16(),
            start.elapsed(),
            bytes.len()
        );

        if !status.is_success() {
            return Err(FetchError::new(Some(status.as_u16()), error_message(&bytes, status.as_u16())));
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::new(Some(status.as_u16()), format!("invalid JSON response: {e}")))
    }

    pub async fn get(&self, path: &str) -> Result<Value, FetchError> {
        self.request(path, RequestOptions::default()).await
    }

    pub async fn get_with_query(&self, path: &str, query: Vec<(String, String)>) -> Result<Value, FetchError> {
        self.request(path, RequestOptions::default().with_query(query)).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, FetchError> {
        self.request(path, RequestOptions::method(Method::POST).with_body(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Value, FetchError> {
        self.request(path, RequestOptions::method(Method::PUT).with_body(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, FetchError> {
        self.request(path, RequestOptions::method(Method::DELETE)).await
    }
}

/// Message for a non-2xx response: the body's `error` or `message` string.
fn error_message(body: &[u8], status: u16) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "message"]
                .iter()
                .find_map(|field| value.get(field).and_then(Value::as_str).map(str::to_string))
        })
        .filter(|msg| !msg.is_empty())
        .unwrap_or_else(|| format!("HTTP {status}"))
}
