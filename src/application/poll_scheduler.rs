//! Fallback Poll Scheduler - periodic forced refresh while push is down.
//!
//! At most one timer runs at a time; `start` while running is a no-op. The
//! scheduler never looks at data freshness. Its action is expected to force
//! a non-cached fetch.
//!
//! `supervise` ties the timer to the channel's `ConnectionState`, sampled on
//! a check interval shorter than the poll interval: Disconnected starts the
//! timer, Connected stops it, Connecting leaves it alone.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::channel_client::ConnectionState;

/// Work performed on every poll tick.
#[async_trait]
pub trait PollAction: Send + Sync {
    async fn poll(&self);
}

#[async_trait]
impl<F, Fut> PollAction for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn poll(&self) {
        self().await
    }
}

struct Timer {
    interval: Duration,
    handle: JoinHandle<()>,
}

/// Single-timer poll scheduler. Clones share the timer.
#[derive(Clone, Default)]
pub struct FallbackPollScheduler {
    timer: Arc<Mutex<Option<Timer>>>,
}

impl FallbackPollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts polling every `interval`, first tick one interval from now.
    ///
    /// Returns false without doing anything if a timer is already running.
    pub fn start(&self, interval: Duration, action: Arc<dyn PollAction>) -> bool {
        let mut timer = self.timer.lock();
        if timer.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return false;
        }

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tracing::debug!("Fallback poll tick");
                action.poll().await;
            }
        });

        tracing::info!(interval_ms = interval.as_millis() as u64, "Fallback polling started");
        *timer = Some(Timer { interval, handle });
        true
    }

    /// Stops the timer. Returns false if none was running.
    pub fn stop(&self) -> bool {
        match self.timer.lock().take() {
            Some(timer) => {
                timer.handle.abort();
                tracing::info!("Fallback polling stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Interval of the running timer.
    pub fn interval(&self) -> Option<Duration> {
        self.timer.lock().as_ref().map(|t| t.interval)
    }

    /// Spawns the supervisor that starts and stops polling from connection state.
    pub fn supervise(
        &self,
        state: watch::Receiver<ConnectionState>,
        check_interval: Duration,
        poll_interval: Duration,
        action: Arc<dyn PollAction>,
    ) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut check = time::interval(check_interval);
            check.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                check.tick().await;
                let current = *state.borrow();
                match current {
                    ConnectionState::Disconnected if !scheduler.is_running() => {
                        scheduler.start(poll_interval, Arc::clone(&action));
                    }
                    ConnectionState::Connected if scheduler.is_running() => {
                        scheduler.stop();
                    }
                    _ => {}
                }
            }
        })
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
