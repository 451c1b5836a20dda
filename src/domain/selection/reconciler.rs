//! Reconciler - recomputes edition selection for a new authoritative collection.
//!
//! The reconciler holds one selection per observed entity and nothing else
//! that influences the result, so `apply` is a pure function of
//! (previous selections, new collection, clock) and re-applying the same
//! input yields the same snapshot.

use std::collections::HashMap;

use super::ordering::{order_editions, reconcile_selection};
use super::snapshot::{EntityView, Snapshot};
use crate::domain::catalog::CatalogEntity;
use crate::domain::foundation::{EditionId, EntityId, Timestamp};

/// Selection bookkeeping for one observation.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    selections: HashMap<EntityId, EditionId>,
    last_input: Vec<CatalogEntity>,
    last_now: Option<Timestamp>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a new collection using the current time.
    pub fn apply(&mut self, entities: Vec<CatalogEntity>) -> Snapshot {
        self.apply_at(entities, Timestamp::now())
    }

    /// Applies a new collection as of `now`.
    ///
    /// Entities without editions carry no selection. Selections of entities
    /// that left the collection are dropped.
    pub fn apply_at(&mut self, entities: Vec<CatalogEntity>, now: Timestamp) -> Snapshot {
        let mut next = HashMap::with_capacity(entities.len());
        let mut views = Vec::with_capacity(entities.len());

        for entity in &entities {
            let editions = order_editions(&entity.editions);
            let selected = reconcile_selection(self.selections.get(&entity.id), &editions, &now);

            if let Some(id) = &selected {
                next.insert(entity.id.clone(), id.clone());
            }
            views.push(EntityView {
                entity: entity.clone(),
                editions,
                selected,
            });
        }

        self.selections = next;
        self.last_input = entities;
        self.last_now = Some(now);
        Snapshot { entities: views }
    }

    /// Records a user's choice of edition and returns the updated snapshot.
    ///
    /// Returns `None` when the entity or edition is not in the last applied
    /// collection; the selection is left unchanged in that case.
    pub fn select(&mut self, entity: &EntityId, edition: &EditionId) -> Option<Snapshot> {
        let exists = self
            .last_input
            .iter()
            .find(|e| &e.id == entity)
            .and_then(|e| e.edition(edition))
            .is_some();
        if !exists {
            return None;
        }

        self.selections.insert(entity.clone(), edition.clone());
        let now = self.last_now.unwrap_or_else(Timestamp::now);
        let input = self.last_input.clone();
        Some(self.apply_at(input, now))
    }

    /// Current selection for an entity.
    pub fn selection(&self, entity: &EntityId) -> Option<&EditionId> {
        self.selections.get(entity)
    }

    /// Forgets everything, as when observation stops.
    pub fn clear(&mut self) {
        self.selections.clear();
        self.last_input.clear();
        self.last_now = None;
    }
}
