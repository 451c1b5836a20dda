//! Push channel adapters.
//!
//! - `SseChannelConnector` - Server-Sent Events over reqwest
//! - `MockChannelConnector` - scripted connections for tests

mod mock_connector;
mod sse_connector;
mod sse_decoder;

pub use mock_connector::{MockChannelConnector, MockConnection};
pub use sse_connector::{SseChannelConnector, SseConnectorConfig};
pub use sse_decoder::SseDecoder;
