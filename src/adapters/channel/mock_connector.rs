//! Mock Channel Connector for testing.
//!
//! Each `connect` consumes the next scripted outcome. An accepted connection
//! hands the test a `MockConnection` used to push frames and to close or
//! break the stream. With nothing scripted, `connect` fails.
//!
//! # Example
//!
//! ```ignore
//! let connector = MockChannelConnector::new();
//! let conn = connector.accept_next();
//! client.connect();
//! conn.send_event("collection-updated", None);
//! conn.close();
//! ```

use async_trait::async_trait;
use futures::channel::mpsc::{self, UnboundedSender};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::domain::events::RawFrame;
use crate::ports::{ChannelConnector, ChannelError, FrameStream};

enum Outcome {
    Accept(FrameStream),
    Reject(ChannelError),
}

/// Scripted push connector.
#[derive(Clone, Default)]
pub struct MockChannelConnector {
    script: Arc<Mutex<VecDeque<Outcome>>>,
    connects: Arc<Mutex<usize>>,
}

impl MockChannelConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the next `connect` to succeed.
    pub fn accept_next(&self) -> MockConnection {
        let (tx, rx) = mpsc::unbounded();
        self.script.lock().push_back(Outcome::Accept(Box::pin(rx)));
        MockConnection { tx }
    }

    /// Scripts the next `connect` to fail.
    pub fn reject_next(&self, error: ChannelError) {
        self.script.lock().push_back(Outcome::Reject(error));
    }

    /// Number of `connect` calls so far.
    pub fn connect_count(&self) -> usize {
        *self.connects.lock()
    }
}

#[async_trait]
impl ChannelConnector for MockChannelConnector {
    async fn connect(&self) -> Result<FrameStream, ChannelError> {
        *self.connects.lock() += 1;

        let outcome = self.script.lock().pop_front();
        match outcome {
            Some(Outcome::Accept(stream)) => Ok(stream),
            Some(Outcome::Reject(error)) => Err(error),
            None => Err(ChannelError::Connect("no scripted connection".to_string())),
        }
    }

    fn describe(&self) -> String {
        "mock channel".to_string()
    }
}

/// Test-side end of an accepted mock connection.
#[derive(Clone)]
pub struct MockConnection {
    tx: UnboundedSender<Result<RawFrame, ChannelError>>,
}

impl MockConnection {
    pub fn send(&self, frame: RawFrame) {
        let _ = self.tx.unbounded_send(Ok(frame));
    }

    /// Sends a named event whose body is `{"type": name, "data": data}`.
    pub fn send_event(&self, name: &str, data: Option<serde_json::Value>) {
        let body = match data {
            Some(data) => serde_json::json!({ "type": name, "data": data }),
            None => serde_json::json!({ "type": name }),
        };
        self.send(RawFrame::new(Some(name), body.to_string()));
    }

    /// Injects a read error, which a client treats as a dropped connection.
    pub fn fail(&self, message: &str) {
        let _ = self.tx.unbounded_send(Err(ChannelError::Stream(message.to_string())));
    }

    /// Ends the stream as a server close would.
    pub fn close(&self) {
        self.tx.close_channel();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
