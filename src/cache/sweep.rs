//! Sweep Module
//!
//! The aging/eviction walk over every live entry. Walks a snapshot of the
//! keys, so entries inserted mid-sweep may be skipped until the next one.

use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rayon::prelude::*;

use crate::cache::CacheEntry;

/// Above this many keys the walk is split across rayon workers.
pub const PARALLEL_THRESHOLD: usize = 16_384;

/// Keys handed to each worker in a parallel walk.
pub const KEYS_PER_WORKER: usize = 8_192;

/// Storage shared by the store and the sweep.
pub(crate) type EntryMap<K, V> = DashMap<K, Arc<CacheEntry<V>>>;

// == Sweep Mode ==
/// What a walk does to each entry it visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sweep {
    age: bool,
    evict: bool,
}

impl Sweep {
    /// Age every entry once, evict nothing.
    pub const AGE: Self = Self {
        age: true,
        evict: false,
    };

    /// Evict entries past either threshold without aging.
    pub const EVICT: Self = Self {
        age: false,
        evict: true,
    };

    /// Age every entry once, then evict.
    pub const FULL: Self = Self {
        age: true,
        evict: true,
    };

    pub fn ages(&self) -> bool {
        self.age
    }

    pub fn evicts(&self) -> bool {
        self.evict
    }
}

// == Policy ==
/// Thresholds read once at the start of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Policy {
    pub capacity: usize,
    pub lifespan: Duration,
}

// == Run ==
/// Walks every key present at the start of the call and returns how many
/// entries were evicted.
///
/// Keys removed by a racing thread are skipped. A key is only removed while
/// it still maps to the exact entry that was judged evictable, so a value
/// written after the check survives.
pub(crate) fn run<K, V>(entries: &EntryMap<K, V>, policy: Policy, mode: Sweep) -> usize
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
{
    let keys: Vec<K> = entries.iter().map(|item| item.key().clone()).collect();
    let now = Instant::now();

    if keys.len() > PARALLEL_THRESHOLD {
        keys.par_chunks(KEYS_PER_WORKER)
            .map(|chunk| {
                chunk
                    .iter()
                    .filter(|key| visit(entries, *key, policy, mode, now))
                    .count()
            })
            .sum()
    } else {
        keys.iter()
            .filter(|key| visit(entries, *key, policy, mode, now))
            .count()
    }
}

/// Applies `mode` to one key. Returns true if this call evicted it.
fn visit<K, V>(
    entries: &EntryMap<K, V>,
    key: &K,
    policy: Policy,
    mode: Sweep,
    now: Instant,
) -> bool
where
    K: Eq + Hash,
{
    // Clone the handle so the shard lock is released before touching the entry
    let Some(entry) = entries.get(key).map(|item| Arc::clone(item.value())) else {
        return false;
    };

    if mode.age {
        entry.age_once();
    }

    if !mode.evict || !entry.is_evictable(policy.capacity, policy.lifespan, now) {
        return false;
    }

    entries
        .remove_if(key, |_, current| {
            Arc::ptr_eq(current, &entry)
                && current.is_evictable(policy.capacity, policy.lifespan, now)
        })
        .is_some()
}
