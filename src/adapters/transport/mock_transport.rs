//! Mock Catalog Transport for testing.
//!
//! Scripted results are consumed in order. Once the script is exhausted the
//! fallback response (if any) is returned for every further call, which lets
//! tests count refetches without scripting each one.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockCatalogTransport::new()
//!     .with_error(TransportError::network("reset"))
//!     .with_fallback(response);
//!
//! transport.fetch(&query).await?;
//! assert_eq!(transport.call_count(), 1);
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::catalog::{CatalogQuery, CatalogResponse};
use crate::ports::{CatalogTransport, TransportError};

/// Mock pull transport.
#[derive(Debug, Clone, Default)]
pub struct MockCatalogTransport {
    script: Arc<Mutex<VecDeque<Result<CatalogResponse, TransportError>>>>,
    fallback: Arc<Mutex<Option<CatalogResponse>>>,
    delay: Duration,
    calls: Arc<Mutex<Vec<CatalogQuery>>>,
}

impl MockCatalogTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response.
    pub fn with_response(self, response: CatalogResponse) -> Self {
        self.push_response(response);
        self
    }

    /// Queues an error.
    pub fn with_error(self, error: TransportError) -> Self {
        self.push_error(error);
        self
    }

    /// Response returned once the script runs out.
    pub fn with_fallback(self, response: CatalogResponse) -> Self {
        self.set_fallback(response);
        self
    }

    /// Simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push_response(&self, response: CatalogResponse) {
        self.script.lock().push_back(Ok(response));
    }

    pub fn push_error(&self, error: TransportError) {
        self.script.lock().push_back(Err(error));
    }

    pub fn set_fallback(&self, response: CatalogResponse) {
        *self.fallback.lock() = Some(response);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Queries received, in order.
    pub fn calls(&self) -> Vec<CatalogQuery> {
        self.calls.lock().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl CatalogTransport for MockCatalogTransport {
    async fn fetch(&self, query: &CatalogQuery) -> Result<CatalogResponse, TransportError> {
        self.calls.lock().push(query.clone());

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let scripted = self.script.lock().pop_front();
        match scripted {
            Some(result) => result,
            None => self
                .fallback
                .lock()
                .clone()
                .ok_or_else(|| TransportError::network("no scripted response")),
        }
    }
}
