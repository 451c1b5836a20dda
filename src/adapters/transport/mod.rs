//! Pull transport adapters.
//!
//! - `HttpCatalogTransport` - reqwest client for the catalog REST endpoints
//! - `RetryingTransport` - bounded exponential-backoff retry decorator
//! - `MockCatalogTransport` - scripted transport for tests

pub mod cache_control;
mod http_transport;
mod mock_transport;
mod retrying_transport;

pub use http_transport::{HttpCatalogTransport, HttpTransportConfig};
pub use mock_transport::MockCatalogTransport;
pub use retrying_transport::{RetryPolicy, RetryingTransport};
