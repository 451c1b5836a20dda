//! Push event kinds.

use std::fmt;

/// Named event kinds carried by the broadcast channel.
///
/// `Any` is the wildcard: subscribing to it receives every event, including
/// events whose name is not recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A whole collection changed (courses or paths added/removed).
    CollectionUpdated,
    /// A single entity changed.
    EntityUpdated,
    /// An entity's schedule (its editions) changed.
    ScheduleUpdated,
    /// Upstream asks every reader to drop what it has and re-read.
    FullResync,
    /// Wildcard for subscriptions only; never parsed from the wire.
    Any,
}

impl EventKind {
    /// Parses a wire name. Separators `-`, `_` and `.` are interchangeable
    /// and matching is case-insensitive.
    pub fn from_wire(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .map(|c| match c {
                '_' | '.' => '-',
                other => other.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "collection-updated" | "courses-updated" | "paths-updated" => {
                Some(EventKind::CollectionUpdated)
            }
            "entity-updated" | "course-updated" | "path-updated" => Some(EventKind::EntityUpdated),
            "schedule-updated" | "schedules-updated" | "editions-updated" => {
                Some(EventKind::ScheduleUpdated)
            }
            "full-resync" | "full-resync-requested" | "resync" => Some(EventKind::FullResync),
            _ => None,
        }
    }

    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CollectionUpdated => "collection-updated",
            EventKind::EntityUpdated => "entity-updated",
            EventKind::ScheduleUpdated => "schedule-updated",
            EventKind::FullResync => "full-resync",
            EventKind::Any => "*",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
