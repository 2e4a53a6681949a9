//! Aging Cache - A thread-safe in-memory cache
//!
//! Entries expire by idle-age (sweeps since last access) and by lifespan
//! (time since last write). Each entry carries its own access gate, so work
//! on one key never waits on another key's write.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheStats, CacheStore};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use tasks::spawn_purge_task;
