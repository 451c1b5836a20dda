//! HTTP Catalog Transport - reqwest implementation of the pull query protocol.
//!
//! Every endpoint answers with the same envelope:
//!
//! ```json
//! { "success": true, "data": [...], "meta": { "total": 12, "timestamp": 1700000000000 } }
//! { "success": false, "error": "course not found" }
//! ```
//!
//! # Configuration
//!
//! ```ignore
//! let config = HttpTransportConfig::new("https://catalog.example.com/api")
//!     .with_api_key("key")
//!     .with_timeout(Duration::from_secs(10));
//!
//! let transport = HttpCatalogTransport::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::cache_control;
use crate::domain::catalog::{CatalogQuery, CatalogResponse, ResponseData, ResponseMeta};
use crate::ports::{CatalogTransport, TransportError};

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL; resource paths are appended to it.
    pub base_url: String,
    /// Sent as `x-api-key` when present.
    api_key: Option<Secret<String>>,
    /// Sent as `Authorization: Bearer` when present.
    bearer_token: Option<Secret<String>>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpTransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            bearer_token: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(key.into()));
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(Secret::new(token.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Pull transport over HTTP.
pub struct HttpCatalogTransport {
    config: HttpTransportConfig,
    client: Client,
}

impl HttpCatalogTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Full URL for a query's resource, without the query string.
    fn resource_url(&self, query: &CatalogQuery) -> String {
        format!("{}/{}", self.config.base_url, query.resource().path())
    }

    async fn send_request(&self, query: &CatalogQuery) -> Result<Response, TransportError> {
        let mut request = self
            .client
            .get(self.resource_url(query))
            .query(&query.params())
            .header(ACCEPT, "application/json");

        if let Some(key) = &self.config.api_key {
            request = request.header("x-api-key", key.expose_secret());
        }
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token.expose_secret());
        }

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::network(format!(
                    "Request timed out after {}s",
                    self.config.timeout.as_secs()
                ))
            } else if e.is_connect() {
                TransportError::network(format!("Connection failed: {}", e))
            } else {
                TransportError::network(e.to_string())
            }
        })
    }

    /// Turns non-2xx statuses into `Upstream` errors.
    async fn handle_response_status(&self, response: Response) -> Result<Response, TransportError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        let message = envelope_error(&error_body).unwrap_or(error_body);

        Err(TransportError::upstream(status.as_u16(), message))
    }

    async fn parse_response(&self, response: Response) -> Result<CatalogResponse, TransportError> {
        let hint = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(cache_control::ttl_hint);

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(format!("Failed to read body: {}", e)))?;

        Ok(parse_envelope(&body)?.with_cache_ttl_hint(hint))
    }
}

#[async_trait]
impl CatalogTransport for HttpCatalogTransport {
    async fn fetch(&self, query: &CatalogQuery) -> Result<CatalogResponse, TransportError> {
        tracing::debug!(query = %query, "Fetching catalog data");

        let response = self.send_request(query).await?;
        let response = self.handle_response_status(response).await?;
        self.parse_response(response).await
    }
}

/// Wire envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope {
    success: Option<bool>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    meta: Option<Value>,
}

/// Validates and decodes a response body.
pub(crate) fn parse_envelope(body: &str) -> Result<CatalogResponse, TransportError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| TransportError::malformed(format!("invalid JSON envelope: {}", e)))?;

    match envelope.success {
        Some(true) => {}
        Some(false) => {
            let message = envelope
                .error
                .as_ref()
                .map(error_text)
                .unwrap_or_else(|| "request rejected".to_string());
            return Err(TransportError::upstream(200, message));
        }
        None => return Err(TransportError::malformed("envelope missing `success`")),
    }

    let data = ResponseData::from_value(envelope.data)
        .map_err(|e| TransportError::malformed(format!("invalid data: {}", e)))?;
    let meta = match envelope.meta {
        Some(Value::Null) | None => ResponseMeta::default(),
        Some(meta) => serde_json::from_value(meta)
            .map_err(|e| TransportError::malformed(format!("invalid meta: {}", e)))?,
    };

    Ok(CatalogResponse {
        data,
        meta,
        cache_ttl_hint: None,
    })
}

/// Extracts the `error` member from an error body, if it is an envelope.
fn envelope_error(body: &str) -> Option<String> {
    let envelope: Envelope = serde_json::from_str(body).ok()?;
    envelope.error.as_ref().map(error_text)
}

fn error_text(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}
