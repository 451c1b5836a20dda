//! Mapping from push events to the cache entries they make stale.

use crate::domain::events::{ChannelEvent, EventKind};
use crate::domain::foundation::EntityKey;
use crate::ports::CacheEntry;

/// Which cached responses a push event affects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationScope {
    All,
    /// Responses that may contain this entity: collections, queries for the
    /// same key, and any response already holding a matching record.
    Entity(EntityKey),
}

impl InvalidationScope {
    /// Entity and schedule updates naming one entity are targeted; anything
    /// else, including unrecognized kinds, invalidates everything.
    pub fn for_event(event: &ChannelEvent) -> Self {
        match (event.kind, event.subject()) {
            (Some(EventKind::EntityUpdated) | Some(EventKind::ScheduleUpdated), Some(key)) => {
                InvalidationScope::Entity(key)
            }
            _ => InvalidationScope::All,
        }
    }

    pub fn covers(&self, entry: &CacheEntry) -> bool {
        match self {
            InvalidationScope::All => true,
            InvalidationScope::Entity(key) => {
                entry.key.may_contain(key) || entry.value.data.iter().any(|e| e.matches(key))
            }
        }
    }
}
