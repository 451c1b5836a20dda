//! Adapters - Implementations of port interfaces.
//!
//! - `transport` - pull protocol over HTTP, plus the retry decorator
//! - `channel` - push channel over Server-Sent Events
//! - `cache` - in-memory response cache

pub mod cache;
pub mod channel;
pub mod transport;

pub use cache::{CacheTtls, InMemoryResponseCache};
pub use channel::{MockChannelConnector, MockConnection, SseChannelConnector, SseConnectorConfig};
pub use transport::{
    HttpCatalogTransport, HttpTransportConfig, MockCatalogTransport, RetryPolicy,
    RetryingTransport,
};
