//! Cache Store Module
//!
//! Main cache engine: a concurrent key/entry map with idle-age and TTL
//! eviction. Every operation takes `&self`; share the store through `Arc`.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, trace};

use crate::cache::entry::nanos;
use crate::cache::stats::StatCounters;
use crate::cache::sweep::{self, EntryMap, Policy, Sweep};
use crate::cache::{CacheEntry, CacheStats};
use crate::config::{CacheConfig, DEFAULT_CAPACITY, DEFAULT_LIFESPAN};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Thread-safe cache whose entries expire by idle-age and by lifespan.
///
/// `capacity` is an idle-age threshold, not an entry-count cap: an entry
/// becomes invalid once `capacity` sweeps have passed without a read or
/// write touching it, or once `lifespan` has elapsed since its last write.
/// Sweeps run inline on writes and policy changes.
pub struct CacheStore<K, V> {
    /// Key-entry storage
    entries: EntryMap<K, V>,
    /// Idle-age threshold
    capacity: AtomicUsize,
    /// Lifespan in nanoseconds
    lifespan_nanos: AtomicU64,
    /// Performance statistics
    counters: StatCounters,
}

impl<K, V> CacheStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    // == Constructors ==
    /// Creates a store with the given idle-age threshold and lifespan.
    ///
    /// Fails with [`CacheError::InvalidArgument`] when either is zero.
    /// Construction is strict, while [`set_capacity`] and [`set_lifespan`]
    /// clamp instead.
    ///
    /// [`set_capacity`]: CacheStore::set_capacity
    /// [`set_lifespan`]: CacheStore::set_lifespan
    pub fn new(capacity: usize, lifespan: Duration) -> Result<Self> {
        match (capacity == 0, lifespan.is_zero()) {
            (false, false) => Ok(Self::with_policy(capacity, lifespan)),
            (true, false) => Err(CacheError::InvalidArgument(
                "capacity must be positive".to_string(),
            )),
            (false, true) => Err(CacheError::InvalidArgument(
                "lifespan must be positive".to_string(),
            )),
            (true, true) => Err(CacheError::InvalidArgument(
                "capacity and lifespan must be positive".to_string(),
            )),
        }
    }

    /// Creates a store with the default 30 day lifespan.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::new(capacity, DEFAULT_LIFESPAN)
    }

    /// Creates a store from configuration, with the same checks as [`new`].
    ///
    /// [`new`]: CacheStore::new
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::new(config.capacity, config.lifespan())
    }

    fn with_policy(capacity: usize, lifespan: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: AtomicUsize::new(capacity),
            lifespan_nanos: AtomicU64::new(nanos(lifespan)),
            counters: StatCounters::default(),
        }
    }

    // == Get ==
    /// Returns the value for `key` if present and still valid.
    ///
    /// Validity is checked on the entry actually read, so an eviction racing
    /// a prior [`contains_valid`] cannot hand back a stale answer. A hit
    /// resets the entry's idle-age.
    ///
    /// [`contains_valid`]: CacheStore::contains_valid
    pub fn try_get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let value = self
            .lookup(key)
            .filter(|entry| self.is_valid(entry, Instant::now()))
            .map(|entry| entry.read());

        match value {
            Some(_) => self.counters.record_hit(),
            None => self.counters.record_miss(),
        }
        value
    }

    /// Like [`try_get`], but reports a miss as [`CacheError::NotFound`].
    ///
    /// Prefer `try_get` on hot paths.
    ///
    /// [`try_get`]: CacheStore::try_get
    pub fn get<Q>(&self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.try_get(key).ok_or(CacheError::NotFound)
    }

    // == Set ==
    /// Stores `value` under `key`.
    ///
    /// Ages every existing entry once, writes the value (in place for an
    /// existing key, as a fresh entry otherwise), then evicts whatever is
    /// past either threshold. Capacity pressure is resolved by eviction,
    /// never by rejecting the write, and the map aborts rather than report
    /// an allocation failure, so this returns `true` for every stored value.
    pub fn try_set(&self, key: K, value: V) -> bool {
        self.sweep(Sweep::AGE);
        self.upsert(key, value);
        self.sweep(Sweep::EVICT);
        true
    }

    /// Stores `value` under `key`. See [`try_set`].
    ///
    /// [`try_set`]: CacheStore::try_set
    pub fn set(&self, key: K, value: V) {
        let _ = self.try_set(key, value);
    }

    // == Contains Valid ==
    /// Returns true if `key` is present and valid, without reading it.
    ///
    /// Does not reset the idle-age.
    pub fn contains_valid<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lookup(key)
            .is_some_and(|entry| self.is_valid(&entry, Instant::now()))
    }

    // == Count ==
    /// Evicts what is past either threshold, then returns the entries left.
    ///
    /// Entries are not aged by counting.
    pub fn count(&self) -> usize {
        self.sweep(Sweep::EVICT);
        self.entries.len()
    }

    // == Remove ==
    /// Removes `key` regardless of validity. Returns true if it was present.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key).is_some()
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.clear();
        debug!("cache cleared");
    }

    // == Purge ==
    /// Evicts entries past either threshold without aging the rest.
    ///
    /// Returns the number of entries removed.
    pub fn purge(&self) -> usize {
        self.sweep(Sweep::EVICT)
    }

    // == Policy ==
    /// Current idle-age threshold.
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Current lifespan.
    pub fn lifespan(&self) -> Duration {
        Duration::from_nanos(self.lifespan_nanos.load(Ordering::Relaxed))
    }

    /// Replaces the idle-age threshold, clamped to at least 1, then sweeps
    /// so a stricter threshold applies immediately.
    pub fn set_capacity(&self, capacity: usize) {
        let capacity = capacity.max(1);
        self.capacity.store(capacity, Ordering::Relaxed);
        info!("Cache capacity set to {}", capacity);
        self.sweep(Sweep::FULL);
    }

    /// Replaces the lifespan, then sweeps so a shorter lifespan applies
    /// immediately. A zero lifespan keeps the previous value.
    pub fn set_lifespan(&self, lifespan: Duration) {
        if lifespan.is_zero() {
            debug!("Ignoring zero lifespan, keeping {:?}", self.lifespan());
        } else {
            self.lifespan_nanos.store(nanos(lifespan), Ordering::Relaxed);
            info!("Cache lifespan set to {:?}", lifespan);
        }
        self.sweep(Sweep::FULL);
    }

    // == Stats ==
    /// Returns current cache statistics. Does not sweep.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.entries.len())
    }

    // == Sweep ==
    /// Runs one walk over every entry and returns the number evicted.
    pub(crate) fn sweep(&self, mode: Sweep) -> usize {
        let evicted = sweep::run(&self.entries, self.policy(), mode);
        self.counters.record_sweep(evicted);

        if evicted > 0 {
            debug!(
                evicted,
                aged = mode.ages(),
                remaining = self.entries.len(),
                "Sweep evicted entries"
            );
        } else {
            trace!(
                aged = mode.ages(),
                evicts = mode.evicts(),
                "Sweep found nothing to evict"
            );
        }
        evicted
    }

    // == Helpers ==
    fn policy(&self) -> Policy {
        Policy {
            capacity: self.capacity(),
            lifespan: self.lifespan(),
        }
    }

    fn is_valid(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        entry.is_valid(self.capacity(), self.lifespan(), now)
    }

    /// Clones the entry handle so the shard lock is not held afterwards.
    fn lookup<Q>(&self, key: &Q) -> Option<Arc<CacheEntry<V>>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|item| Arc::clone(item.value()))
    }

    /// Writes in place for an existing key, inserts a fresh entry otherwise.
    /// Does not sweep.
    ///
    /// An existing entry is touched while the shard lock is still held, so a
    /// sweep cannot judge it evictable between lookup and write. If a sweep
    /// still removes it while the write waits on the gate, the written entry
    /// is put back.
    fn upsert(&self, key: K, value: V) {
        let existing = match self.entries.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                occupied.get().touch();
                Arc::clone(occupied.get())
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(CacheEntry::new(value)));
                return;
            }
        };
        // Shard lock is released here; only this entry's gate is contended.
        existing.write(value);

        if let Entry::Vacant(vacant) = self.entries.entry(key) {
            debug!("Restoring entry evicted during its write");
            vacant.insert(existing);
        }
    }
}

impl<K, V> Default for CacheStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Capacity 128, lifespan 30 days.
    fn default() -> Self {
        Self::with_policy(DEFAULT_CAPACITY, DEFAULT_LIFESPAN)
    }
}

impl<K, V> fmt::Debug for CacheStore<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.entries.len())
            .field("capacity", &self.capacity.load(Ordering::Relaxed))
            .field(
                "lifespan",
                &Duration::from_nanos(self.lifespan_nanos.load(Ordering::Relaxed)),
            )
            .finish()
    }
}
