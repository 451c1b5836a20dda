//! Typed publish/subscribe registry for push events.
//!
//! Listeners are keyed by `EventKind`. A listener registered for
//! `EventKind::Any` receives every event, including kinds this layer does
//! not recognize. For one event, matching listeners run in registration
//! order.
//!
//! # Example
//!
//! ```ignore
//! let subscription = registry.subscribe(EventKind::ScheduleUpdated, |event: &ChannelEvent| {
//!     tracing::info!(name = %event.name, "schedule changed");
//! });
//! // ...
//! subscription.unsubscribe();
//! ```

use parking_lot::RwLock;
use std::sync::{Arc, Weak};

use crate::domain::events::{ChannelEvent, EventKind};

/// Receives dispatched events.
///
/// Called on the channel's driver task; implementations must not block.
pub trait ChannelListener: Send + Sync {
    fn on_event(&self, event: &ChannelEvent);
}

impl<F> ChannelListener for F
where
    F: Fn(&ChannelEvent) + Send + Sync,
{
    fn on_event(&self, event: &ChannelEvent) {
        self(event)
    }
}

/// Identifies one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

struct Registration {
    token: SubscriptionToken,
    kind: EventKind,
    listener: Arc<dyn ChannelListener>,
}

#[derive(Default)]
struct Registrations {
    next_token: u64,
    entries: Vec<Registration>,
}

impl Registrations {
    fn remove(&mut self, token: SubscriptionToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|r| r.token != token);
        self.entries.len() != before
    }
}

/// Listener registry shared by the channel client and its subscribers.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    inner: Arc<RwLock<Registrations>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `kind`. Dropping the returned handle removes it.
    pub fn subscribe<L>(&self, kind: EventKind, listener: L) -> Subscription
    where
        L: ChannelListener + 'static,
    {
        self.subscribe_arc(kind, Arc::new(listener))
    }

    pub fn subscribe_arc(&self, kind: EventKind, listener: Arc<dyn ChannelListener>) -> Subscription {
        let mut inner = self.inner.write();
        let token = SubscriptionToken(inner.next_token);
        inner.next_token += 1;
        inner.entries.push(Registration {
            token,
            kind,
            listener,
        });

        Subscription {
            token,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Removes a registration by token. Returns false if it was already gone.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.inner.write().remove(token)
    }

    /// Delivers `event` to every matching listener and returns how many ran.
    ///
    /// The lock is released before listeners run, so a listener may
    /// subscribe or unsubscribe from inside its callback.
    pub fn dispatch(&self, event: &ChannelEvent) -> usize {
        let listeners: Vec<Arc<dyn ChannelListener>> = self
            .inner
            .read()
            .entries
            .iter()
            .filter(|r| r.kind == EventKind::Any || event.kind == Some(r.kind))
            .map(|r| Arc::clone(&r.listener))
            .collect();

        for listener in &listeners {
            listener.on_event(event);
        }
        listeners.len()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to one registration.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    token: SubscriptionToken,
    registry: Weak<RwLock<Registrations>>,
}

impl Subscription {
    pub fn token(&self) -> SubscriptionToken {
        self.token
    }

    /// Removes the registration now.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.write().remove(self.token);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("token", &self.token).finish()
    }
}
