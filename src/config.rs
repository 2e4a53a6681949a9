//! Configuration Module
//!
//! Serializable cache settings. The crate itself reads no environment
//! variables or files; embedding applications deserialize this struct from
//! whatever source they use.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default idle-age threshold
pub const DEFAULT_CAPACITY: usize = 128;

/// Default lifespan: 30 days
pub const DEFAULT_LIFESPAN: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default interval of the background purge task
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Cache configuration parameters.
///
/// Missing fields fall back to the defaults when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Idle-age threshold at which an entry becomes invalid
    pub capacity: usize,
    /// Maximum seconds since the last write before an entry becomes invalid
    pub lifespan_secs: u64,
    /// Background purge frequency in seconds
    pub purge_interval_secs: u64,
}

impl CacheConfig {
    /// Lifespan as a `Duration`.
    pub fn lifespan(&self) -> Duration {
        Duration::from_secs(self.lifespan_secs)
    }

    /// Purge interval as a `Duration`.
    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            lifespan_secs: DEFAULT_LIFESPAN.as_secs(),
            purge_interval_secs: DEFAULT_PURGE_INTERVAL.as_secs(),
        }
    }
}
