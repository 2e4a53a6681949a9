//! Cache Entry Module
//!
//! One stored value plus its access gate, last-write timestamp and idle-age.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;

use crate::cache::AccessGate;

// == Cache Entry ==
/// A single cache slot.
///
/// The value sits behind an atomically swapped pointer, so a reader sees
/// either the previous complete value or the new complete value and never
/// holds anything a writer has to wait for. The gate only serializes
/// writers. The idle-age and timestamp are relaxed atomics: they feed the
/// eviction heuristic and are not linearizable with respect to reads.
pub struct CacheEntry<V> {
    value: ArcSwap<V>,
    gate: AccessGate,
    /// Reference point for `last_write_nanos`
    born: Instant,
    /// Nanoseconds from `born` to the most recent write
    last_write_nanos: AtomicU64,
    /// Sweeps since the last read or write
    idle_age: AtomicUsize,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a fresh entry: idle-age 0, written now.
    pub fn new(value: V) -> Self {
        Self {
            value: ArcSwap::from_pointee(value),
            gate: AccessGate::new(),
            born: Instant::now(),
            last_write_nanos: AtomicU64::new(0),
            idle_age: AtomicUsize::new(0),
        }
    }

    // == Read ==
    /// Returns a copy of the value and resets the idle-age.
    ///
    /// Waits out an in-progress write, then clones from a snapshot of the
    /// current value; never waits on other readers. The last-write
    /// timestamp is left alone.
    pub fn read(&self) -> V
    where
        V: Clone,
    {
        self.gate.await_quiescent_write();
        let value = V::clone(&self.value.load());
        self.idle_age.store(0, Ordering::Relaxed);
        value
    }

    // == Write ==
    /// Replaces the value, then resets the idle-age and stamps the write time.
    ///
    /// Only the swap runs inside the exclusive window; the age reset and
    /// timestamp follow it. The previous value is released after the window.
    pub fn write(&self, value: V) {
        let previous = {
            let _write = self.gate.begin_write();
            self.value.swap(Arc::new(value))
        };
        self.touch();
        drop(previous);
    }

    // == Touch ==
    /// Resets the idle-age and stamps the write time without changing the
    /// value.
    ///
    /// Called while a write is pending so a sweep cannot judge the entry
    /// evictable in the meantime.
    pub fn touch(&self) {
        self.idle_age.store(0, Ordering::Relaxed);
        self.last_write_nanos
            .store(nanos(self.born.elapsed()), Ordering::Relaxed);
    }

    // == Age Once ==
    /// Increments the idle-age by one. Saturates instead of wrapping.
    pub fn age_once(&self) {
        let _ = self
            .idle_age
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |age| {
                age.checked_add(1)
            });
    }

    #[cfg(test)]
    pub(crate) fn gate(&self) -> &AccessGate {
        &self.gate
    }

    /// Sweeps since the last read or write.
    pub fn idle_age(&self) -> usize {
        self.idle_age.load(Ordering::Relaxed)
    }

    /// When the value was last written.
    pub fn last_write(&self) -> Instant {
        self.born + Duration::from_nanos(self.last_write_nanos.load(Ordering::Relaxed))
    }

    // == Policy Checks ==
    /// True once `lifespan` has fully elapsed since the last write.
    pub fn is_expired(&self, lifespan: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_write()) > lifespan
    }

    /// Readable: idle-age below `capacity` and lifespan not yet elapsed.
    pub fn is_valid(&self, capacity: usize, lifespan: Duration, now: Instant) -> bool {
        self.idle_age() < capacity && !self.is_expired(lifespan, now)
    }

    /// Removable by a sweep: idle-age beyond `capacity` or lifespan elapsed.
    ///
    /// An entry whose idle-age equals `capacity` is already invalid but is
    /// kept until the next sweep pushes it past the threshold.
    pub fn is_evictable(&self, capacity: usize, lifespan: Duration, now: Instant) -> bool {
        self.idle_age() > capacity || self.is_expired(lifespan, now)
    }
}

impl<V> fmt::Debug for CacheEntry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("idle_age", &self.idle_age())
            .field("last_write", &self.last_write())
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

// == Utility Functions ==
/// Converts a duration to whole nanoseconds, saturating at `u64::MAX`.
pub(crate) fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
