//! Selection module - deterministic edition selection.
//!
//! - `ordering` - pure comparison and default-selection rules
//! - `reconciler` - per-observation selection state
//! - `snapshot` - what consumers render

mod ordering;
mod reconciler;
mod snapshot;

pub use ordering::{compare_editions, default_selection, order_editions, reconcile_selection};
pub use reconciler::Reconciler;
pub use snapshot::{EntityView, Snapshot};
