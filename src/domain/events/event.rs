//! Push events as dispatched to listeners.
//!
//! # Wire format
//!
//! A frame carries an optional transport-level event name and a JSON body:
//!
//! ```text
//! event: schedule-updated
//! data: {"type":"schedule-updated","data":{"id":"c-1"},"timestamp":1736467200000}
//! ```
//!
//! The body `type` wins over the frame name. Decoding never fails: anything
//! that cannot be understood becomes an event with an `Unknown` payload so
//! the reader re-fetches.

use serde_json::Value;

use super::kind::EventKind;
use super::payload::DeltaPayload;
use crate::domain::foundation::{EntityKey, Timestamp};

/// One message as delivered by a channel connector, before interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrame {
    /// Transport-level event name (SSE `event:` field).
    pub event: Option<String>,
    /// Message body.
    pub data: String,
    /// Transport-level message id (SSE `id:` field).
    pub id: Option<String>,
}

impl RawFrame {
    pub fn new(event: Option<&str>, data: impl Into<String>) -> Self {
        Self {
            event: event.map(String::from),
            data: data.into(),
            id: None,
        }
    }
}

/// An interpreted push event.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEvent {
    /// Recognized kind; `None` for names this layer does not know.
    pub kind: Option<EventKind>,
    /// Name as received, for logging.
    pub name: String,
    pub payload: DeltaPayload,
    pub timestamp: Option<Timestamp>,
    pub id: Option<String>,
}

/// Result of decoding a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub event: ChannelEvent,
    /// Set when the body or payload shape was invalid.
    pub malformed: Option<String>,
}

impl ChannelEvent {
    /// Builds an event directly; convenient for tests and local triggers.
    pub fn new(kind: EventKind, payload: DeltaPayload) -> Self {
        Self {
            kind: Some(kind),
            name: kind.as_str().to_string(),
            payload,
            timestamp: None,
            id: None,
        }
    }

    /// Interprets a raw frame.
    pub fn decode(frame: &RawFrame) -> DecodedFrame {
        let frame_name = frame.event.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let body = match serde_json::from_str::<Value>(&frame.data) {
            Ok(Value::Object(body)) => body,
            Ok(_) | Err(_) => {
                let name = frame_name.unwrap_or("").to_string();
                return DecodedFrame {
                    event: ChannelEvent {
                        kind: EventKind::from_wire(&name),
                        name,
                        payload: DeltaPayload::Unknown,
                        timestamp: None,
                        id: frame.id.clone(),
                    },
                    malformed: Some("body is not a JSON object".to_string()),
                };
            }
        };

        let name = body
            .get("type")
            .and_then(Value::as_str)
            .or(frame_name)
            .unwrap_or("")
            .to_string();

        let (mut payload, malformed) = DeltaPayload::from_data(body.get("data"));

        let body_id = body.get("id").and_then(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        // A bare `id` alongside absent data names the changed entity.
        if payload == DeltaPayload::Unknown && malformed.is_none() {
            if let Some(id) = &body_id {
                payload = DeltaPayload::Reference(EntityKey::Id(id.clone()));
            }
        }

        let timestamp = body.get("timestamp").and_then(|v| match v {
            Value::Number(n) => n.as_i64().and_then(Timestamp::from_unix_millis),
            Value::String(s) => Timestamp::parse_rfc3339(s),
            _ => None,
        });

        DecodedFrame {
            event: ChannelEvent {
                kind: EventKind::from_wire(&name),
                name,
                payload,
                timestamp,
                id: body_id.or_else(|| frame.id.clone()),
            },
            malformed,
        }
    }

    /// Key of the entity this event refers to, when it names exactly one.
    pub fn subject(&self) -> Option<EntityKey> {
        match &self.payload {
            DeltaPayload::Reference(key) => Some(key.clone()),
            DeltaPayload::Inline(entities) if entities.len() == 1 => {
                Some(EntityKey::Id(entities[0].id.as_str().to_string()))
            }
            _ => None,
        }
    }
}
