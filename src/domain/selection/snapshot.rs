//! Snapshots handed to presentation code.

use crate::domain::catalog::{CatalogEntity, Edition};
use crate::domain::foundation::{EditionId, EntityId, EntityKey};

/// One entity with its editions in display order and the current selection.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    pub entity: CatalogEntity,
    pub editions: Vec<Edition>,
    pub selected: Option<EditionId>,
}

impl EntityView {
    pub fn id(&self) -> &EntityId {
        &self.entity.id
    }

    /// Current data of the selected edition.
    pub fn selected_edition(&self) -> Option<&Edition> {
        let id = self.selected.as_ref()?;
        self.editions.iter().find(|e| &e.id == id)
    }
}

/// Stable view of an observed collection after reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub entities: Vec<EntityView>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// First entity; the only one for single-entity observations.
    pub fn primary(&self) -> Option<&EntityView> {
        self.entities.first()
    }

    pub fn find(&self, key: &EntityKey) -> Option<&EntityView> {
        self.entities.iter().find(|v| v.entity.matches(key))
    }

    /// Selected edition of the first entity.
    pub fn selected_edition(&self) -> Option<&Edition> {
        self.primary().and_then(EntityView::selected_edition)
    }
}
