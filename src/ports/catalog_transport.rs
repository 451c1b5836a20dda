//! CatalogTransport port - Interface for the pull query protocol.
//!
//! One `fetch` is one logical request. Retry policy lives in a wrapping
//! adapter, so implementations perform exactly one network attempt.

use async_trait::async_trait;

use crate::domain::catalog::{CatalogQuery, CatalogResponse};

/// Port for fetching catalog data from the upstream system of record.
///
/// # Example
///
/// ```ignore
/// let query = CatalogQuery::by_slug(Resource::Courses, "example-course");
/// let response = transport.fetch(&query).await?;
/// for entity in response.entities() { /* ... */ }
/// ```
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    /// Fetches the current upstream state for `query`.
    ///
    /// A body with `success: false` is an `Upstream` error even when the
    /// HTTP status was 200.
    async fn fetch(&self, query: &CatalogQuery) -> Result<CatalogResponse, TransportError>;
}

/// Pull transport errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No response reached us.
    #[error("network error: {0}")]
    Network(String),

    /// A response arrived but was a rejection.
    #[error("upstream error {status}: {message}")]
    Upstream {
        /// HTTP status, 200 for a `success: false` body.
        status: u16,
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl TransportError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates an upstream error.
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Creates a malformed payload error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload(message.into())
    }

    /// Returns true if retrying could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network(_) => true,
            TransportError::Upstream { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            TransportError::MalformedPayload(_) => false,
        }
    }
}
