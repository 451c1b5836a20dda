//! Retrying Transport - Decorator adding bounded retry with exponential backoff.
//!
//! Wraps any `CatalogTransport`. Only errors whose `is_retryable()` is true
//! are retried; the last error is returned once attempts run out.
//!
//! # Example
//!
//! ```ignore
//! let transport = RetryingTransport::new(http, RetryPolicy::default());
//! // attempt 1, wait 250ms, attempt 2, wait 500ms, attempt 3
//! ```

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::catalog::{CatalogQuery, CatalogResponse};
use crate::ports::{CatalogTransport, TransportError};

/// Retry bounds for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Wait before the second attempt; doubles afterwards.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait after the given failed attempt (0-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Transport decorator that retries transient failures.
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: CatalogTransport> RetryingTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl<T: CatalogTransport> CatalogTransport for RetryingTransport<T> {
    async fn fetch(&self, query: &CatalogQuery) -> Result<CatalogResponse, TransportError> {
        let mut attempt = 0;

        loop {
            match self.inner.fetch(query).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if !err.is_retryable() || attempt + 1 >= self.policy.max_attempts {
                        return Err(err);
                    }

                    let delay = self.policy.delay_after(attempt);
                    tracing::warn!(
                        query = %query,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Catalog fetch failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::transport::MockCatalogTransport;
    use crate::domain::catalog::{ResponseData, Resource};
    use tokio::time::Instant;

    fn query() -> CatalogQuery {
        CatalogQuery::by_slug(Resource::Courses, "example-course")
    }

    fn ok() -> CatalogResponse {
        CatalogResponse::new(ResponseData::Empty)
    }

    #[test]
    fn delays_double() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay_after(0), Duration::from_millis(100));
        assert_eq!(policy.delay_after(1), Duration::from_millis(200));
        assert_eq!(policy.delay_after(2), Duration::from_millis(400));
    }

    #[test]
    fn at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let mock = MockCatalogTransport::new()
            .with_error(TransportError::network("reset"))
            .with_error(TransportError::upstream(503, "busy"))
            .with_response(ok());
        let transport = RetryingTransport::new(mock.clone(), RetryPolicy::default());

        let started = Instant::now();
        let result = transport.fetch(&query()).await;

        assert!(result.is_ok());
        assert_eq!(mock.call_count(), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failures_are_not_retried() {
        let mock = MockCatalogTransport::new()
            .with_error(TransportError::upstream(404, "missing"))
            .with_response(ok());
        let transport = RetryingTransport::new(mock.clone(), RetryPolicy::default());

        let err = transport.fetch(&query()).await.unwrap_err();

        assert_eq!(err, TransportError::upstream(404, "missing"));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn last_error_is_returned_when_attempts_run_out() {
        let mock = MockCatalogTransport::new()
            .with_error(TransportError::network("one"))
            .with_error(TransportError::network("two"))
            .with_error(TransportError::network("three"))
            .with_response(ok());
        let transport = RetryingTransport::new(mock.clone(), RetryPolicy::default());

        let err = transport.fetch(&query()).await.unwrap_err();

        assert_eq!(err, TransportError::network("three"));
        assert_eq!(mock.call_count(), 3);
    }
}
