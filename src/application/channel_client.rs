//! Event Channel Client - one logical connection to the broadcast channel.
//!
//! A single driver task owns the physical connection and walks the state
//! machine:
//!
//! ```text
//! Connecting --handshake ok--> Connected --close/error--> Disconnected
//!      ^                                                       |
//!      +------------- after base * 2^attempts -----------------+
//! ```
//!
//! After `max_attempts` consecutive failures the `ExhaustedPolicy` decides
//! whether the driver waits for a manual `reconnect()` or keeps probing at a
//! slow interval. Channel failures are never returned to subscribers; they
//! only move the published `ConnectionState`.

use futures::StreamExt;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use super::backoff::{ExhaustedPolicy, ReconnectBackoff};
use super::subscriptions::{ChannelListener, Subscription, SubscriptionRegistry};
use crate::domain::events::{ChannelEvent, EventKind, RawFrame};
use crate::ports::ChannelConnector;

/// Connection state of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Reconnect behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelSettings {
    pub backoff: ReconnectBackoff,
    pub on_exhausted: ExhaustedPolicy,
}

struct Shared {
    connector: Arc<dyn ChannelConnector>,
    settings: ChannelSettings,
    registry: SubscriptionRegistry,
    state: watch::Sender<ConnectionState>,
    reconnect: Notify,
}

struct Driver {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Push channel client.
pub struct EventChannelClient {
    shared: Arc<Shared>,
    driver: Mutex<Option<Driver>>,
}

impl EventChannelClient {
    pub fn new(connector: Arc<dyn ChannelConnector>, settings: ChannelSettings) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            shared: Arc::new(Shared {
                connector,
                settings,
                registry: SubscriptionRegistry::new(),
                state,
                reconnect: Notify::new(),
            }),
            driver: Mutex::new(None),
        }
    }

    /// Starts the driver task. Calling it while the driver runs is a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut driver = self.driver.lock();
        if driver.as_ref().is_some_and(|d| !d.handle.is_finished()) {
            return;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let shared = Arc::clone(&self.shared);
        tracing::info!(channel = %shared.connector.describe(), "Starting event channel");
        let handle = tokio::spawn(async move { shared.run(shutdown_rx).await });
        *driver = Some(Driver { shutdown, handle });
    }

    /// Forces a new connection attempt now, resetting the attempt budget.
    ///
    /// Wakes a driver that gave up or is waiting out a backoff delay. Does
    /// nothing while connected.
    pub fn reconnect(&self) {
        let running = self
            .driver
            .lock()
            .as_ref()
            .is_some_and(|d| !d.handle.is_finished());

        if !running {
            self.connect();
        } else if self.state() != ConnectionState::Connected {
            tracing::info!("Manual reconnect requested");
            self.shared.reconnect.notify_one();
        }
    }

    /// Stops the driver and closes the connection.
    pub async fn disconnect(&self) {
        let driver = self.driver.lock().take();
        if let Some(driver) = driver {
            let _ = driver.shutdown.send(true);
            let _ = driver.handle.await;
        }
        self.shared.set_state(ConnectionState::Disconnected);
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Registers a listener; see [`SubscriptionRegistry::subscribe`].
    pub fn subscribe<L>(&self, kind: EventKind, listener: L) -> Subscription
    where
        L: ChannelListener + 'static,
    {
        self.shared.registry.subscribe(kind, listener)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.registry.len()
    }
}

impl Drop for EventChannelClient {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.get_mut().take() {
            driver.handle.abort();
        }
    }
}

/// How the driver left a wait.
enum Wake {
    Elapsed,
    Reconnect,
    Shutdown,
}

impl Shared {
    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
        if changed {
            tracing::info!(state = %next, "Event channel state changed");
        }
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut attempts: u32 = 0;

        loop {
            self.set_state(ConnectionState::Connecting);

            let connected = tokio::select! {
                _ = shutdown.changed() => return,
                _ = self.reconnect.notified() => {
                    attempts = 0;
                    continue;
                }
                result = self.connector.connect() => result,
            };

            match connected {
                Ok(mut frames) => {
                    attempts = 0;
                    self.set_state(ConnectionState::Connected);

                    loop {
                        tokio::select! {
                            _ = shutdown.changed() => return,
                            frame = frames.next() => match frame {
                                Some(Ok(frame)) => self.handle_frame(&frame),
                                Some(Err(err)) => {
                                    tracing::warn!(error = %err, "Event channel stream failed");
                                    break;
                                }
                                None => {
                                    tracing::info!("Event channel closed by server");
                                    break;
                                }
                            },
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(attempt = attempts + 1, error = %err, "Event channel connect failed");
                }
            }

            self.set_state(ConnectionState::Disconnected);

            let backoff = self.settings.backoff;
            let wake = if backoff.is_exhausted(attempts) {
                match self.settings.on_exhausted {
                    ExhaustedPolicy::Manual => {
                        tracing::warn!(attempts, "Event channel gave up; waiting for manual reconnect");
                        self.wait(&mut shutdown, None).await
                    }
                    ExhaustedPolicy::Probe(interval) => {
                        tracing::debug!(
                            delay_ms = interval.as_millis() as u64,
                            "Event channel probing after exhausted attempts"
                        );
                        self.wait(&mut shutdown, Some(interval)).await
                    }
                }
            } else {
                let delay = backoff.delay_for(attempts);
                attempts += 1;
                tracing::debug!(attempt = attempts, delay_ms = delay.as_millis() as u64, "Event channel reconnecting");
                self.wait(&mut shutdown, Some(delay)).await
            };

            match wake {
                Wake::Shutdown => return,
                Wake::Reconnect => attempts = 0,
                Wake::Elapsed => {}
            }
        }
    }

    /// Waits for `delay` (or forever), a manual reconnect, or shutdown.
    async fn wait(&self, shutdown: &mut watch::Receiver<bool>, delay: Option<std::time::Duration>) -> Wake {
        let timer = async {
            match delay {
                Some(delay) => sleep(delay).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = shutdown.changed() => Wake::Shutdown,
            _ = self.reconnect.notified() => Wake::Reconnect,
            _ = timer => Wake::Elapsed,
        }
    }

    fn handle_frame(&self, frame: &RawFrame) {
        let decoded = ChannelEvent::decode(frame);
        if let Some(reason) = &decoded.malformed {
            tracing::warn!(
                event_kind = %decoded.event.name,
                reason = %reason,
                "Malformed channel payload; treating as re-fetch"
            );
        }

        let delivered = self.registry.dispatch(&decoded.event);
        tracing::debug!(event_kind = %decoded.event.name, delivered, "Dispatched channel event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::channel::MockChannelConnector;
    use crate::domain::events::DeltaPayload;
    use crate::domain::foundation::EntityKey;
    use crate::ports::ChannelError;
    use std::time::Duration;
    use tokio::time::Instant;

    fn settings(max_attempts: u32, on_exhausted: ExhaustedPolicy) -> ChannelSettings {
        ChannelSettings {
            backoff: ReconnectBackoff::new(Duration::from_secs(1), Duration::from_secs(30), max_attempts),
            on_exhausted,
        }
    }

    async fn wait_for(rx: &mut watch::Receiver<ConnectionState>, state: ConnectionState) {
        while *rx.borrow_and_update() != state {
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn connects_and_dispatches_to_subscribers() {
        let connector = MockChannelConnector::new();
        let conn = connector.accept_next();
        let client = EventChannelClient::new(Arc::new(connector.clone()), ChannelSettings::default());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let _sub = client.subscribe(EventKind::EntityUpdated, move |e: &ChannelEvent| {
            seen2.lock().push(e.payload.clone());
        });

        let mut state = client.watch_state();
        client.connect();
        wait_for(&mut state, ConnectionState::Connected).await;
        assert!(client.is_connected());

        conn.send_event("entity-updated", Some(serde_json::json!("c-7")));
        conn.send_event("full-resync", None);
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(
            *seen.lock(),
            vec![DeltaPayload::Reference(EntityKey::Id("c-7".into()))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn connect_twice_opens_one_connection() {
        let connector = MockChannelConnector::new();
        let _conn = connector.accept_next();
        let client = EventChannelClient::new(Arc::new(connector.clone()), ChannelSettings::default());

        let mut state = client.watch_state();
        client.connect();
        client.connect();
        wait_for(&mut state, ConnectionState::Connected).await;
        client.connect();

        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_payload_does_not_end_subscription() {
        let connector = MockChannelConnector::new();
        let conn = connector.accept_next();
        let client = EventChannelClient::new(Arc::new(connector.clone()), ChannelSettings::default());

        let count = Arc::new(Mutex::new(0usize));
        let count2 = Arc::clone(&count);
        let _sub = client.subscribe(EventKind::Any, move |_: &ChannelEvent| *count2.lock() += 1);

        let mut state = client.watch_state();
        client.connect();
        wait_for(&mut state, ConnectionState::Connected).await;

        conn.send(RawFrame::new(Some("collection-updated"), "{not json"));
        conn.send(RawFrame::new(Some("entity-updated"), r#"{"data":[{"title":"no id"}]}"#));
        conn.send_event("full-resync", None);
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(*count.lock(), 3);
        assert!(client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_with_growing_delays() {
        let connector = MockChannelConnector::new();
        let conn = connector.accept_next();
        connector.reject_next(ChannelError::Connect("refused".into()));
        connector.reject_next(ChannelError::Handshake { status: 503 });
        let _second = connector.accept_next();

        let client = EventChannelClient::new(Arc::new(connector.clone()), settings(5, ExhaustedPolicy::Manual));
        let mut state = client.watch_state();
        client.connect();
        wait_for(&mut state, ConnectionState::Connected).await;

        let dropped_at = Instant::now();
        conn.close();
        wait_for(&mut state, ConnectionState::Disconnected).await;
        wait_for(&mut state, ConnectionState::Connected).await;

        // 1s + 2s + 4s of backoff before the fourth connect.
        assert_eq!(connector.connect_count(), 4);
        assert_eq!(dropped_at.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_until_manual_reconnect() {
        let connector = MockChannelConnector::new();
        for _ in 0..3 {
            connector.reject_next(ChannelError::Connect("refused".into()));
        }
        let client = EventChannelClient::new(Arc::new(connector.clone()), settings(2, ExhaustedPolicy::Manual));

        client.connect();
        tokio::time::sleep(Duration::from_secs(3600)).await;

        assert_eq!(connector.connect_count(), 3);
        assert_eq!(client.state(), ConnectionState::Disconnected);

        let _conn = connector.accept_next();
        let mut state = client.watch_state();
        client.reconnect();
        wait_for(&mut state, ConnectionState::Connected).await;
        assert_eq!(connector.connect_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_policy_keeps_trying_slowly() {
        let connector = MockChannelConnector::new();
        let client = EventChannelClient::new(
            Arc::new(connector.clone()),
            settings(1, ExhaustedPolicy::Probe(Duration::from_secs(300))),
        );

        client.connect();
        // connect, 1s backoff, connect, then a probe every 300s
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(connector.connect_count(), 2);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(connector.connect_count(), 3);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(connector.connect_count(), 4);
        client.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_stops_driver_and_dispatch() {
        let connector = MockChannelConnector::new();
        let conn = connector.accept_next();
        let client = EventChannelClient::new(Arc::new(connector.clone()), ChannelSettings::default());

        let count = Arc::new(Mutex::new(0usize));
        let count2 = Arc::clone(&count);
        let _sub = client.subscribe(EventKind::Any, move |_: &ChannelEvent| *count2.lock() += 1);

        let mut state = client.watch_state();
        client.connect();
        wait_for(&mut state, ConnectionState::Connected).await;

        client.disconnect().await;
        conn.send_event("full-resync", None);
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(*count.lock(), 0);
        assert_eq!(connector.connect_count(), 1);
    }
}
