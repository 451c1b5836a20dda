//! SSE Channel Connector - broadcast channel over Server-Sent Events.
//!
//! Subscribes with `GET {url}?channel={name}` and `Accept: text/event-stream`.
//! A 2xx answer confirms the handshake; the body is then decoded frame by
//! frame until the server closes it.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

use super::sse_decoder::SseDecoder;
use crate::ports::{ChannelConnector, ChannelError, FrameStream};

/// Configuration for the SSE connector.
#[derive(Debug, Clone)]
pub struct SseConnectorConfig {
    pub url: String,
    /// Named channel to join.
    pub channel: String,
    api_key: Option<Secret<String>>,
    bearer_token: Option<Secret<String>>,
    /// Bound on connection setup only; an open stream has no deadline.
    pub connect_timeout: Duration,
}

impl SseConnectorConfig {
    pub fn new(url: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            channel: channel.into(),
            api_key: None,
            bearer_token: None,
            connect_timeout: Duration::from_secs(10),
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

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Connector opening one SSE stream per `connect`.
pub struct SseChannelConnector {
    config: SseConnectorConfig,
    client: Client,
}

impl SseChannelConnector {
    pub fn new(config: SseConnectorConfig) -> Result<Self, ChannelError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ChannelError::Connect(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl ChannelConnector for SseChannelConnector {
    async fn connect(&self) -> Result<FrameStream, ChannelError> {
        let mut request = self
            .client
            .get(&self.config.url)
            .query(&[("channel", self.config.channel.as_str())])
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");

        if let Some(key) = &self.config.api_key {
            request = request.header("x-api-key", key.expose_secret());
        }
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Handshake {
                status: status.as_u16(),
            });
        }

        let frames = response
            .bytes_stream()
            .scan(SseDecoder::new(), |decoder, chunk| {
                let items = match chunk {
                    Ok(bytes) => decoder.push(&bytes).into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(ChannelError::Stream(e.to_string()))],
                };
                futures::future::ready(Some(items))
            })
            .flat_map(stream::iter);

        Ok(Box::pin(frames))
    }

    fn describe(&self) -> String {
        format!("{} (channel {})", self.config.url, self.config.channel)
    }
}
