//! Cache Module
//!
//! Provides a concurrent in-memory cache with idle-age and TTL eviction.

mod entry;
mod gate;
mod stats;
mod store;
mod sweep;


// Re-export public types
pub use entry::CacheEntry;
pub use gate::{AccessGate, WriteGuard};
pub use stats::CacheStats;
pub use store::CacheStore;
pub use sweep::{KEYS_PER_WORKER, PARALLEL_THRESHOLD};
