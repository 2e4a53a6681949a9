//! Cache Statistics Module
//!
//! Tracks cache metrics including hits, misses, evictions and sweeps.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of reads that returned a value
    pub hits: u64,
    /// Number of reads on an absent or invalid key
    pub misses: u64,
    /// Number of entries removed by sweeps
    pub evictions: u64,
    /// Number of sweeps run
    pub sweeps: u64,
    /// Entries in the map when the snapshot was taken
    pub total_entries: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stat Counters ==
/// Live counters shared by every thread using a store.
///
/// Relaxed atomics: the numbers are diagnostics, not synchronization.
#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    sweeps: AtomicU64,
}

impl StatCounters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sweep(&self, evicted: usize) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, total_entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            total_entries,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let stats = StatCounters::default().snapshot(0);
        assert_eq!(stats, CacheStats::default());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let counters = StatCounters::default();
        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        assert_eq!(counters.snapshot(0).hit_rate(), 0.75);
    }

    #[test]
    fn test_record_sweep() {
        let counters = StatCounters::default();
        counters.record_sweep(0);
        counters.record_sweep(3);

        let stats = counters.snapshot(5);
        assert_eq!(stats.sweeps, 2);
        assert_eq!(stats.evictions, 3);
        assert_eq!(stats.total_entries, 5);
    }

    #[test]
    fn test_stats_serialize() {
        let counters = StatCounters::default();
        counters.record_hit();
        let json = serde_json::to_value(counters.snapshot(1)).unwrap();
        assert_eq!(json["hits"], 1);
        assert_eq!(json["total_entries"], 1);
    }
}
