//! Catalog Sync - live synchronization of catalog data.
//!
//! Keeps an in-memory view of externally managed catalog entities (courses,
//! learning paths, schedules, seat availability) consistent with the upstream
//! system of record. Push notifications arrive over a broadcast channel;
//! when it is down, a fallback poller takes over. Responses are cached with a
//! freshness window, and edition selection is reconciled deterministically
//! every time the data changes shape.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
