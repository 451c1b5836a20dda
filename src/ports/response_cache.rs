//! ResponseCache port - Time-boxed storage of the last good response per query shape.
//!
//! Entries are written on every successful fetch and never on failure.
//! Staleness does not delete an entry; it only decides whether the entry may
//! be served without a new fetch. Stale entries remain available as a
//! fallback when the upstream is unreachable.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

use crate::domain::catalog::{CatalogResponse, QueryShape};

/// One cached response.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: QueryShape,
    pub value: CatalogResponse,
    pub fetched_at: Instant,
    /// Freshness window chosen when the entry was written.
    pub ttl: Duration,
}

impl CacheEntry {
    /// Fresh iff `now - fetched_at < ttl`.
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) < self.ttl
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.fetched_at)
    }
}

/// Port for the response cache.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Returns the entry for `key`, fresh or stale.
    async fn get(&self, key: &QueryShape) -> Option<CacheEntry>;

    /// Stores `value` as the newest response for `key`, replacing any entry.
    async fn put(&self, key: QueryShape, value: CatalogResponse) -> CacheEntry;

    /// Removes every entry.
    async fn invalidate_all(&self);

    /// Marks matching entries stale without removing them. Returns how many
    /// fresh entries were affected.
    async fn expire_where(&self, predicate: &(dyn for<'e> Fn(&'e CacheEntry) -> bool + Send + Sync)) -> usize;

    /// Whether `entry` may be served without a fetch right now.
    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        entry.is_fresh_at(Instant::now())
    }
}
