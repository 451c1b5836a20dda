//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers and error types that form the
//! vocabulary of the catalog synchronization domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{EditionId, EntityId, EntityKey, ObservationId};
pub use timestamp::Timestamp;
