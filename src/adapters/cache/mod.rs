//! Response cache adapters.
//!
//! - `InMemoryResponseCache` - process-wide map keyed by query shape

mod in_memory;

pub use in_memory::{CacheTtls, InMemoryResponseCache};
