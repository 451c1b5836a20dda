//! Observation - one consumer's live view of a catalog query.
//!
//! Each observation runs a worker task that owns a `Reconciler` and publishes
//! `ObservedView`s on a watch channel. Refreshes come from three places:
//!
//! - push events, debounced, always forcing a fetch past the cache
//! - fallback poll ticks while the channel is down, never debounced
//! - explicit `refresh()` calls
//!
//! Inline push payloads that update records already in view are applied
//! without a fetch. Collection-level events on a collection observation
//! always refetch: the query's filters decide membership and only upstream
//! can evaluate them.
//!
//! Teardown is deterministic: `stop()` (or drop) removes the channel
//! subscription, cancels a pending debounce and aborts the worker, so no
//! callback runs for a consumer that has gone away.

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::debounce::{DebounceTrigger, Debouncer};
use super::errors::SyncError;
use super::subscriptions::Subscription;
use super::sync_service::{FetchOptions, Freshness, SyncService};
use crate::domain::catalog::{CatalogEntity, CatalogQuery, QueryShape};
use crate::domain::events::{ChannelEvent, DeltaPayload, EventKind};
use crate::domain::foundation::{EditionId, EntityId, EntityKey, ObservationId};
use crate::domain::selection::{Reconciler, Snapshot};
use crate::ports::TransportError;

/// What an observer sees.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedView {
    pub snapshot: Snapshot,
    pub freshness: Freshness,
    /// Last refresh failure, when the view could not be brought up to date.
    pub error: Option<TransportError>,
}

enum Command {
    Refresh { force: bool },
    Pushed {
        kind: Option<EventKind>,
        payload: DeltaPayload,
    },
    Select {
        entity: EntityId,
        edition: EditionId,
        reply: oneshot::Sender<bool>,
    },
}

/// Handle to a running observation.
pub struct Observation {
    id: ObservationId,
    query: CatalogQuery,
    view: watch::Receiver<Option<ObservedView>>,
    commands: mpsc::UnboundedSender<Command>,
    subscription: Option<Subscription>,
    debouncer: Option<Debouncer>,
    task: Option<JoinHandle<()>>,
}

impl Observation {
    pub(crate) fn spawn(service: SyncService, query: CatalogQuery) -> Self {
        let id = ObservationId::new();
        let (commands, inbox) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(None);

        let refresh = commands.clone();
        let debouncer = Debouncer::spawn(service.settings().debounce, move || {
            let _ = refresh.send(Command::Refresh { force: true });
        });

        let pushed = commands.clone();
        let subscription = service.subscribe(EventKind::Any, move |event: &ChannelEvent| {
            let _ = pushed.send(Command::Pushed {
                kind: event.kind,
                payload: event.payload.clone(),
            });
        });

        let worker = Worker {
            id,
            shape: query.shape(),
            query: query.clone(),
            ticks: service.poll_ticks(),
            service,
            reconciler: Reconciler::new(),
            entities: None,
            freshness: Freshness::Unavailable,
            error: None,
            view: view_tx,
            refetch: debouncer.handle(),
        };
        tracing::debug!(observation = %id, query = %query, "Observation started");
        let task = tokio::spawn(worker.run(inbox));

        Self {
            id,
            query,
            view,
            commands,
            subscription: Some(subscription),
            debouncer: Some(debouncer),
            task: Some(task),
        }
    }

    pub fn id(&self) -> ObservationId {
        self.id
    }

    pub fn query(&self) -> &CatalogQuery {
        &self.query
    }

    /// Latest view; `None` until the first load completes.
    pub fn view(&self) -> Option<ObservedView> {
        self.view.borrow().clone()
    }

    /// Latest snapshot, empty before the first load.
    pub fn snapshot(&self) -> Snapshot {
        self.view().map(|v| v.snapshot).unwrap_or_default()
    }

    /// A receiver for rendering loops that prefer `watch` semantics.
    pub fn watch(&self) -> watch::Receiver<Option<ObservedView>> {
        self.view.clone()
    }

    /// Current view, waiting for the first load if needed.
    pub async fn ready(&mut self) -> Result<ObservedView, SyncError> {
        if let Some(view) = self.view.borrow_and_update().clone() {
            return Ok(view);
        }
        self.changed().await
    }

    /// Waits for the next published view.
    pub async fn changed(&mut self) -> Result<ObservedView, SyncError> {
        loop {
            self.view
                .changed()
                .await
                .map_err(|_| SyncError::ObservationClosed)?;
            if let Some(view) = self.view.borrow_and_update().clone() {
                return Ok(view);
            }
        }
    }

    /// Requests a forced refresh.
    pub fn refresh(&self) -> Result<(), SyncError> {
        self.commands
            .send(Command::Refresh { force: true })
            .map_err(|_| SyncError::ObservationClosed)
    }

    /// Records the user's choice of edition.
    ///
    /// Returns false when the entity or edition is not in the current view.
    pub async fn select_edition(&self, entity: &EntityId, edition: &EditionId) -> Result<bool, SyncError> {
        let (reply, answer) = oneshot::channel();
        self.commands
            .send(Command::Select {
                entity: entity.clone(),
                edition: edition.clone(),
                reply,
            })
            .map_err(|_| SyncError::ObservationClosed)?;
        answer.await.map_err(|_| SyncError::ObservationClosed)
    }

    /// Stops observing.
    pub fn stop(mut self) {
        self.teardown();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn teardown(&mut self) {
        let had_task = self.task.is_some();
        self.subscription.take();
        self.debouncer.take();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if had_task {
            tracing::debug!(observation = %self.id, "Observation stopped");
        }
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.teardown();
    }
}

struct Worker {
    id: ObservationId,
    query: CatalogQuery,
    shape: QueryShape,
    service: SyncService,
    ticks: broadcast::Receiver<()>,
    reconciler: Reconciler,
    /// Last applied collection; `None` before the first load.
    entities: Option<Vec<CatalogEntity>>,
    freshness: Freshness,
    error: Option<TransportError>,
    view: watch::Sender<Option<ObservedView>>,
    refetch: DebounceTrigger,
}

impl Worker {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Command>) {
        self.load(false).await;

        loop {
            tokio::select! {
                command = inbox.recv() => match command {
                    Some(Command::Refresh { force }) => self.load(force).await,
                    Some(Command::Pushed { kind, payload }) => self.on_push(kind, payload),
                    Some(Command::Select { entity, edition, reply }) => {
                        let _ = reply.send(self.select(&entity, &edition));
                    }
                    None => return,
                },
                tick = self.ticks.recv() => match tick {
                    Ok(()) | Err(RecvError::Lagged(_)) => self.load(true).await,
                    Err(RecvError::Closed) => return,
                },
            }
        }
    }

    async fn load(&mut self, force: bool) {
        let options = FetchOptions {
            force_refresh: force,
        };
        match self.service.fetch(&self.query, options).await {
            Ok(fetched) => self.apply(fetched.response.entities(), fetched.freshness, fetched.error),
            Err(err) => {
                tracing::warn!(observation = %self.id, query = %self.query, error = %err, "Observation refresh failed");
                self.error = err.as_transport().cloned();
                self.freshness = match self.entities {
                    Some(_) => Freshness::Stale,
                    None => Freshness::Unavailable,
                };
                let (freshness, error) = (self.freshness, self.error.clone());
                self.view.send_modify(|view| match view {
                    Some(view) => {
                        view.freshness = freshness;
                        view.error = error;
                    }
                    None => {
                        *view = Some(ObservedView {
                            snapshot: Snapshot::default(),
                            freshness,
                            error,
                        })
                    }
                });
            }
        }
    }

    fn apply(&mut self, entities: Vec<CatalogEntity>, freshness: Freshness, error: Option<TransportError>) {
        let snapshot = self.reconciler.apply(entities.clone());
        self.entities = Some(entities);
        self.freshness = freshness;
        self.error = error;
        self.publish(snapshot);
    }

    fn publish(&self, snapshot: Snapshot) {
        self.view.send_replace(Some(ObservedView {
            snapshot,
            freshness: self.freshness,
            error: self.error.clone(),
        }));
    }

    fn on_push(&mut self, kind: Option<EventKind>, payload: DeltaPayload) {
        if self.reshapes(kind) {
            self.refetch.trigger();
            return;
        }

        match payload {
            DeltaPayload::Unknown => {
                self.refetch.trigger();
            }
            DeltaPayload::Reference(key) => {
                if self.concerns(&key) {
                    self.refetch.trigger();
                }
            }
            DeltaPayload::Inline(entities) => self.apply_inline(entities),
        }
    }

    /// Events that may add or remove members of what this observation shows.
    fn reshapes(&self, kind: Option<EventKind>) -> bool {
        match kind {
            Some(EventKind::FullResync) => true,
            Some(EventKind::CollectionUpdated) => self.query.is_collection(),
            _ => false,
        }
    }

    fn concerns(&self, key: &EntityKey) -> bool {
        self.shape.may_contain(key)
            || self
                .entities
                .as_ref()
                .is_some_and(|current| current.iter().any(|e| e.matches(key)))
    }

    /// Replaces records already in view. Records that might be new members
    /// of a collection trigger a refetch instead.
    fn apply_inline(&mut self, incoming: Vec<CatalogEntity>) {
        let Some(current) = &self.entities else {
            self.refetch.trigger();
            return;
        };

        let mut next = current.clone();
        let mut replaced = false;
        let mut unplaced = false;

        for entity in incoming {
            if let Some(slot) = next.iter_mut().find(|e| e.id == entity.id) {
                *slot = entity;
                replaced = true;
            } else if self.query.is_collection() {
                unplaced = true;
            } else if self.query.key().is_some_and(|key| entity.matches(key)) {
                next = vec![entity];
                replaced = true;
            }
        }

        if replaced {
            tracing::debug!(observation = %self.id, "Applied inline push payload");
            self.apply(next, Freshness::Pushed, None);
        }
        if unplaced {
            self.refetch.trigger();
        }
    }

    fn select(&mut self, entity: &EntityId, edition: &EditionId) -> bool {
        match self.reconciler.select(entity, edition) {
            Some(snapshot) => {
                self.publish(snapshot);
                true
            }
            None => false,
        }
    }
}
