//! Application layer - the running synchronization machinery.
//!
//! Coordinates the ports: the channel client drives push, the poll scheduler
//! covers for it when it is down, and observations turn fetched data into
//! reconciled snapshots.

mod backoff;
mod channel_client;
mod debounce;
mod errors;
mod invalidation;
mod observation;
mod poll_scheduler;
mod subscriptions;
mod sync_service;

pub use backoff::{ExhaustedPolicy, ReconnectBackoff};
pub use channel_client::{ChannelSettings, ConnectionState, EventChannelClient};
pub use debounce::{DebounceTrigger, Debouncer};
pub use errors::SyncError;
pub use invalidation::InvalidationScope;
pub use observation::{Observation, ObservedView};
pub use poll_scheduler::{FallbackPollScheduler, PollAction};
pub use subscriptions::{ChannelListener, Subscription, SubscriptionRegistry, SubscriptionToken};
pub use sync_service::{FetchOptions, Fetched, Freshness, SyncService, SyncSettings};
