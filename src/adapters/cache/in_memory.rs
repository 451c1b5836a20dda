//! In-memory response cache.
//!
//! The working set is bounded by the number of distinct query shapes a page
//! issues, so there is no eviction beyond explicit invalidation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::domain::catalog::{CatalogResponse, QueryFamily, QueryShape};
use crate::ports::{CacheEntry, ResponseCache};

/// TTL policy per query family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// For seat counts, schedules and courses.
    pub volatile: Duration,
    /// For rarely-changing collections such as path definitions.
    pub stable: Duration,
    /// Let a `Cache-Control` hint shorten the family TTL.
    pub honor_cache_control: bool,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            volatile: Duration::from_secs(60),
            stable: Duration::from_secs(300),
            honor_cache_control: true,
        }
    }
}

impl CacheTtls {
    /// Effective TTL for a response of the given family.
    ///
    /// A hint can only shorten the family TTL, never extend it.
    pub fn ttl_for(&self, family: QueryFamily, hint: Option<Duration>) -> Duration {
        let base = match family {
            QueryFamily::Volatile => self.volatile,
            QueryFamily::Stable => self.stable,
        };
        match hint {
            Some(hint) if self.honor_cache_control => base.min(hint),
            _ => base,
        }
    }
}

/// Process-wide in-memory cache, shared by every observation.
#[derive(Debug, Clone)]
pub struct InMemoryResponseCache {
    entries: Arc<RwLock<HashMap<QueryShape, CacheEntry>>>,
    ttls: CacheTtls,
}

impl InMemoryResponseCache {
    pub fn new(ttls: CacheTtls) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttls,
        }
    }

    pub fn ttls(&self) -> CacheTtls {
        self.ttls
    }

    /// Number of stored entries, fresh or stale.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemoryResponseCache {
    fn default() -> Self {
        Self::new(CacheTtls::default())
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, key: &QueryShape) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    async fn put(&self, key: QueryShape, value: CatalogResponse) -> CacheEntry {
        let ttl = self.ttls.ttl_for(key.family(), value.cache_ttl_hint);
        let entry = CacheEntry {
            key: key.clone(),
            value,
            fetched_at: Instant::now(),
            ttl,
        };
        self.entries.write().await.insert(key, entry.clone());
        entry
    }

    async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        tracing::debug!(removed, "Response cache cleared");
    }

    async fn expire_where(&self, predicate: &(dyn for<'e> Fn(&'e CacheEntry) -> bool + Send + Sync)) -> usize {
        let mut entries = self.entries.write().await;
        let mut expired = 0;
        for entry in entries.values_mut() {
            if entry.ttl > Duration::ZERO && predicate(entry) {
                entry.ttl = Duration::ZERO;
                expired += 1;
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{CatalogQuery, ResponseData, Resource};
    use crate::domain::foundation::EntityKey;

    fn response() -> CatalogResponse {
        CatalogResponse::new(ResponseData::Empty)
    }

    #[tokio::test(start_paused = true)]
    async fn get_immediately_after_put_is_fresh() {
        let cache = InMemoryResponseCache::default();
        let key = CatalogQuery::by_slug(Resource::Courses, "example-course").shape();

        cache.put(key.clone(), response()).await;
        let entry = cache.get(&key).await.unwrap();

        assert!(cache.is_fresh(&entry));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_go_stale_but_stay_readable() {
        let cache = InMemoryResponseCache::default();
        let key = CatalogQuery::collection(Resource::Availability).shape();
        cache.put(key.clone(), response()).await;

        tokio::time::advance(Duration::from_secs(61)).await;

        let entry = cache.get(&key).await.unwrap();
        assert!(!cache.is_fresh(&entry));
    }

    #[tokio::test(start_paused = true)]
    async fn stable_family_gets_long_ttl() {
        let cache = InMemoryResponseCache::default();
        let key = CatalogQuery::collection(Resource::Paths).shape();
        cache.put(key.clone(), response()).await;

        tokio::time::advance(Duration::from_secs(120)).await;

        assert!(cache.is_fresh(&cache.get(&key).await.unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn cache_control_hint_only_shortens() {
        let cache = InMemoryResponseCache::default();
        let short = CatalogQuery::collection(Resource::Paths).shape();
        let long = CatalogQuery::collection(Resource::Courses).shape();

        let e = cache
            .put(short, response().with_cache_ttl_hint(Some(Duration::from_secs(5))))
            .await;
        assert_eq!(e.ttl, Duration::from_secs(5));

        let e = cache
            .put(long, response().with_cache_ttl_hint(Some(Duration::from_secs(3600))))
            .await;
        assert_eq!(e.ttl, Duration::from_secs(60));
    }

    #[test]
    fn hint_ignored_when_disabled() {
        let ttls = CacheTtls {
            honor_cache_control: false,
            ..Default::default()
        };
        assert_eq!(
            ttls.ttl_for(QueryFamily::Stable, Some(Duration::ZERO)),
            Duration::from_secs(300)
        );
    }

    #[tokio::test]
    async fn invalidate_all_removes_everything() {
        let cache = InMemoryResponseCache::default();
        cache.put(CatalogQuery::collection(Resource::Paths).shape(), response()).await;
        cache.put(CatalogQuery::by_id(Resource::Courses, "1").shape(), response()).await;
        assert_eq!(cache.len().await, 2);

        cache.invalidate_all().await;

        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn expire_where_keeps_values_but_marks_stale() {
        let cache = InMemoryResponseCache::default();
        let hit = CatalogQuery::by_slug(Resource::Courses, "a").shape();
        let miss = CatalogQuery::by_slug(Resource::Courses, "b").shape();
        cache.put(hit.clone(), response()).await;
        cache.put(miss.clone(), response()).await;

        let key = EntityKey::Slug("a".into());
        let expired = cache
            .expire_where(&|entry: &CacheEntry| entry.key.may_contain(&key))
            .await;

        assert_eq!(expired, 1);
        assert!(!cache.is_fresh(&cache.get(&hit).await.unwrap()));
        assert!(cache.is_fresh(&cache.get(&miss).await.unwrap()));
    }
}
