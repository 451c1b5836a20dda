//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the synchronization core and the outside world. Adapters implement these
//! ports.
//!
//! - `CatalogTransport` - Pull query protocol (request/response)
//! - `ChannelConnector` - Push broadcast channel connections
//! - `ResponseCache` - Time-boxed response storage

mod catalog_transport;
mod channel_connector;
mod response_cache;

pub use catalog_transport::{CatalogTransport, TransportError};
pub use channel_connector::{ChannelConnector, ChannelError, FrameStream};
pub use response_cache::{CacheEntry, ResponseCache};
