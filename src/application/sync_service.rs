//! SyncService - the single synchronization instance shared by all consumers.
//!
//! Owns exactly one cache, one transport, one event channel client and one
//! poll scheduler. Consumers receive a clone of the service (clones share
//! everything) instead of reaching for globals, so tests build a fresh
//! instance each time.
//!
//! # Example
//!
//! ```ignore
//! let service = SyncService::new(&config)?;
//! let mut observation = service.observe(CatalogQuery::by_slug(Resource::Courses, "example-course"));
//! let view = observation.ready().await?;
//! render(&view.snapshot);
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use super::channel_client::{ChannelSettings, ConnectionState, EventChannelClient};
use super::errors::SyncError;
use super::invalidation::InvalidationScope;
use super::observation::Observation;
use super::poll_scheduler::{FallbackPollScheduler, PollAction};
use super::subscriptions::{ChannelListener, Subscription};
use crate::adapters::{
    HttpCatalogTransport, InMemoryResponseCache, RetryingTransport, SseChannelConnector,
};
use crate::config::SyncConfig;
use crate::domain::catalog::{CatalogQuery, CatalogResponse};
use crate::domain::events::{ChannelEvent, EventKind};
use crate::ports::{CacheEntry, CatalogTransport, ChannelConnector, ResponseCache, TransportError};

/// Runtime timing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Forced refresh period while the channel is down.
    pub poll_interval: Duration,
    /// How often connection state is sampled; shorter than `poll_interval`.
    pub check_interval: Duration,
    /// Window collapsing bursts of push-triggered refetches.
    pub debounce: Duration,
    pub channel: ChannelSettings,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(30_000),
            check_interval: Duration::from_millis(5_000),
            debounce: Duration::from_millis(500),
            channel: ChannelSettings::default(),
        }
    }
}

/// Per-call fetch options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchOptions {
    /// Skip the freshness check and always go to the transport.
    pub force_refresh: bool,
}

impl FetchOptions {
    pub fn forced() -> Self {
        Self {
            force_refresh: true,
        }
    }
}

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Fetched from upstream just now.
    Fresh,
    /// Served from a cache entry still inside its TTL.
    Cached,
    /// The fetch failed; an older response was served instead.
    Stale,
    /// Applied from an inline push payload.
    Pushed,
    /// The fetch failed and nothing was cached.
    Unavailable,
}

/// Result of [`SyncService::fetch`].
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub response: CatalogResponse,
    pub freshness: Freshness,
    /// The failure behind a `Stale` result.
    pub error: Option<TransportError>,
}

struct Background {
    _invalidation: Subscription,
    invalidator: JoinHandle<()>,
    supervisor: JoinHandle<()>,
}

impl Drop for Background {
    fn drop(&mut self) {
        self.invalidator.abort();
        self.supervisor.abort();
    }
}

struct Core {
    settings: SyncSettings,
    transport: Arc<dyn CatalogTransport>,
    cache: Arc<dyn ResponseCache>,
    channel: EventChannelClient,
    poller: FallbackPollScheduler,
    poll_ticks: broadcast::Sender<()>,
    background: Mutex<Option<Background>>,
}

/// Shared synchronization service.
#[derive(Clone)]
pub struct SyncService {
    core: Arc<Core>,
}

impl SyncService {
    /// Builds the production stack: HTTP transport with retry, in-memory
    /// cache, SSE channel.
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let http = HttpCatalogTransport::new(config.endpoint.transport_config())?;
        let transport = RetryingTransport::new(http, config.endpoint.retry_policy());
        let cache = InMemoryResponseCache::new(config.cache.ttls());
        let connector = SseChannelConnector::new(config.connector_config())?;

        Ok(Self::with_parts(
            config.settings(),
            Arc::new(transport),
            Arc::new(cache),
            Arc::new(connector),
        ))
    }

    /// Builds a service from explicit parts.
    pub fn with_parts(
        settings: SyncSettings,
        transport: Arc<dyn CatalogTransport>,
        cache: Arc<dyn ResponseCache>,
        connector: Arc<dyn ChannelConnector>,
    ) -> Self {
        let (poll_ticks, _) = broadcast::channel(16);
        Self {
            core: Arc::new(Core {
                settings,
                transport,
                cache,
                channel: EventChannelClient::new(connector, settings.channel),
                poller: FallbackPollScheduler::new(),
                poll_ticks,
                background: Mutex::new(None),
            }),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.core.settings
    }

    /// Connects the channel and starts cache invalidation and poll
    /// supervision. Idempotent; `observe` calls it on first use.
    pub fn start(&self) {
        let mut background = self.core.background.lock();
        if background.is_some() {
            return;
        }

        let (scopes, mut pending) = mpsc::unbounded_channel::<InvalidationScope>();
        let invalidation = self
            .core
            .channel
            .subscribe(EventKind::Any, move |event: &ChannelEvent| {
                let _ = scopes.send(InvalidationScope::for_event(event));
            });

        let cache = Arc::clone(&self.core.cache);
        let invalidator = tokio::spawn(async move {
            while let Some(scope) = pending.recv().await {
                let expired = cache.expire_where(&|entry: &CacheEntry| scope.covers(entry)).await;
                tracing::debug!(scope = ?scope, expired, "Cache entries expired by push event");
            }
        });

        let ticks = self.core.poll_ticks.clone();
        let action: Arc<dyn PollAction> = Arc::new(move || {
            let _ = ticks.send(());
            async {}
        });
        let settings = self.core.settings;
        let supervisor = self.core.poller.supervise(
            self.core.channel.watch_state(),
            settings.check_interval,
            settings.poll_interval,
            action,
        );

        self.core.channel.connect();

        *background = Some(Background {
            _invalidation: invalidation,
            invalidator,
            supervisor,
        });
    }

    /// Returns a fresh cached response, or fetches and caches a new one.
    ///
    /// When the transport fails, a cached response of any age is served as
    /// `Stale`; only with nothing cached does the failure propagate.
    pub async fn fetch(&self, query: &CatalogQuery, options: FetchOptions) -> Result<Fetched, SyncError> {
        let shape = query.shape();
        let cache = &self.core.cache;

        if !options.force_refresh {
            if let Some(entry) = cache.get(&shape).await {
                if cache.is_fresh(&entry) {
                    tracing::debug!(query = %query, "Cache hit");
                    return Ok(Fetched {
                        response: entry.value,
                        freshness: Freshness::Cached,
                        error: None,
                    });
                }
            }
        }

        tracing::debug!(query = %query, forced = options.force_refresh, "Fetching from upstream");
        match self.core.transport.fetch(query).await {
            Ok(response) => {
                cache.put(shape, response.clone()).await;
                Ok(Fetched {
                    response,
                    freshness: Freshness::Fresh,
                    error: None,
                })
            }
            Err(err) => match cache.get(&shape).await {
                Some(entry) => {
                    tracing::warn!(query = %query, error = %err, "Fetch failed; serving cached response");
                    Ok(Fetched {
                        response: entry.value,
                        freshness: Freshness::Stale,
                        error: Some(err),
                    })
                }
                None => {
                    tracing::warn!(query = %query, error = %err, "Fetch failed with nothing cached");
                    Err(err.into())
                }
            },
        }
    }

    /// Removes every cached response, e.g. after a write by this consumer.
    pub async fn invalidate_all(&self) {
        self.core.cache.invalidate_all().await;
    }

    /// Starts observing `query`. Must be called from within a tokio runtime.
    pub fn observe(&self, query: CatalogQuery) -> Observation {
        self.start();
        Observation::spawn(self.clone(), query)
    }

    /// Registers a listener on the shared channel.
    pub fn subscribe<L>(&self, kind: EventKind, listener: L) -> Subscription
    where
        L: ChannelListener + 'static,
    {
        self.core.channel.subscribe(kind, listener)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.core.channel.state()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.core.channel.watch_state()
    }

    pub fn is_connected(&self) -> bool {
        self.core.channel.is_connected()
    }

    /// Forces a channel reconnect, e.g. after it gave up.
    pub fn reconnect(&self) {
        self.core.channel.reconnect();
    }

    pub fn is_polling(&self) -> bool {
        self.core.poller.is_running()
    }

    pub(crate) fn poll_ticks(&self) -> broadcast::Receiver<()> {
        self.core.poll_ticks.subscribe()
    }

    /// Stops background work and closes the channel. Observations still
    /// alive keep their last view.
    pub async fn shutdown(&self) {
        let background = self.core.background.lock().take();
        drop(background);
        self.core.poller.stop();
        self.core.channel.disconnect().await;
        tracing::info!("Sync service stopped");
    }
}
