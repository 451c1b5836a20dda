//! ChannelConnector port - Interface for the push broadcast channel.
//!
//! A connector opens one physical connection per call. `connect` resolves
//! only after the handshake is confirmed; the returned stream then yields
//! frames until the connection closes (stream end) or fails (an `Err` item).
//! Reconnect policy belongs to the caller.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::domain::events::RawFrame;

/// Stream of frames from one open connection.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<RawFrame, ChannelError>> + Send>>;

/// Port for opening broadcast channel connections.
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    /// Opens a connection and completes the handshake.
    async fn connect(&self) -> Result<FrameStream, ChannelError>;

    /// Short description for logs (e.g. the channel URL).
    fn describe(&self) -> String;
}

/// Push transport errors. Never surfaced to the UI; they only move the
/// connection state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// Connection could not be established.
    #[error("channel connect failed: {0}")]
    Connect(String),

    /// The server answered but refused the subscription.
    #[error("channel handshake rejected with status {status}")]
    Handshake { status: u16 },

    /// The connection ended.
    #[error("channel closed")]
    Closed,

    /// Reading from an open connection failed.
    #[error("channel stream error: {0}")]
    Stream(String),
}
