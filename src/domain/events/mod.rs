//! Events module - push-channel vocabulary.
//!
//! Frames arrive as [`RawFrame`]s from a channel connector, are decoded into
//! [`ChannelEvent`]s and fanned out by kind.

mod event;
mod kind;
mod payload;

pub use event::{ChannelEvent, DecodedFrame, RawFrame};
pub use kind::EventKind;
pub use payload::DeltaPayload;
