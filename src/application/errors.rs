//! Application-level error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::ports::{ChannelError, TransportError};

/// Errors surfaced by the synchronization service.
///
/// Channel failures only ever reach callers of explicit channel operations;
/// observers see them as a connection state change.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("observation has stopped")]
    ObservationClosed,
}

impl SyncError {
    /// The transport failure, if this is one.
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            SyncError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_convert_and_display_transparently() {
        let err: SyncError = TransportError::upstream(503, "busy").into();
        assert_eq!(err.to_string(), "upstream error 503: busy");
        assert!(err.as_transport().is_some());
    }

    #[test]
    fn closed_observation_display() {
        assert_eq!(SyncError::ObservationClosed.to_string(), "observation has stopped");
        assert!(SyncError::ObservationClosed.as_transport().is_none());
    }
}
