//! Trailing-edge debouncer.
//!
//! Every trigger restarts the window; the action runs once the window has
//! passed with no further trigger. Dropping the `Debouncer` cancels a
//! pending run.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Cloneable trigger side of a debouncer.
#[derive(Debug, Clone)]
pub struct DebounceTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl DebounceTrigger {
    /// Returns false once the debouncer is gone.
    pub fn trigger(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

/// Owns the debounce task.
#[derive(Debug)]
pub struct Debouncer {
    trigger: DebounceTrigger,
    handle: JoinHandle<()>,
}

impl Debouncer {
    pub fn spawn<F>(window: Duration, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let action = Arc::new(action);

        let handle = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                let mut collapsed = 1usize;
                loop {
                    tokio::select! {
                        next = rx.recv() => match next {
                            Some(()) => collapsed += 1,
                            None => return,
                        },
                        _ = sleep(window) => break,
                    }
                }
                tracing::debug!(collapsed, "Debounce window closed");
                action();
            }
        });

        Self {
            trigger: DebounceTrigger { tx },
            handle,
        }
    }

    pub fn trigger(&self) -> bool {
        self.trigger.trigger()
    }

    pub fn handle(&self) -> DebounceTrigger {
        self.trigger.clone()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::clone(&count);
        (count, move || {
            count2.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_one_run() {
        let (count, action) = counter();
        let debouncer = Debouncer::spawn(Duration::from_millis(500), action);

        for _ in 0..10 {
            debouncer.trigger();
            sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(450)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn separated_triggers_run_separately() {
        let (count, action) = counter();
        let debouncer = Debouncer::spawn(Duration::from_millis(500), action);

        debouncer.trigger();
        sleep(Duration::from_millis(600)).await;
        debouncer.handle().trigger();
        sleep(Duration::from_millis(600)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending_run() {
        let (count, action) = counter();
        let debouncer = Debouncer::spawn(Duration::from_millis(500), action);
        let trigger = debouncer.handle();

        debouncer.trigger();
        drop(debouncer);
        sleep(Duration::from_secs(1)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!trigger.trigger());
    }
}
