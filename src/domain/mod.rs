//! Domain layer containing catalog types and pure synchronization logic.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (timestamps, identifiers, errors)
//! - `catalog` - Entities, editions, queries and responses
//! - `events` - Push event kinds, frames and delta payloads
//! - `selection` - Edition ordering and the reconciler

pub mod catalog;
pub mod events;
pub mod foundation;
pub mod selection;
