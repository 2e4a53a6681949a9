//! Access Gate Module
//!
//! Per-entry writer exclusion. Readers never register with the gate; they
//! only wait out a write in progress. Every wait is a short spin with
//! exponential backoff instead of a park, since a write is a pointer swap.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_utils::Backoff;

// == Access Gate ==
/// Spin gate guarding one cache entry.
///
/// At most one writer holds the gate. Readers never wait on other readers,
/// and a writer never waits on readers. Distinct gates share nothing, so
/// work on one entry never stalls another.
///
/// The gate does not detect re-entrancy: calling [`begin_write`] twice on the
/// same thread without dropping the first guard spins forever.
///
/// [`begin_write`]: AccessGate::begin_write
#[derive(Debug, Default)]
pub struct AccessGate {
    writing: AtomicBool,
}

impl AccessGate {
    // == Constructor ==
    /// Creates an idle gate.
    pub const fn new() -> Self {
        Self {
            writing: AtomicBool::new(false),
        }
    }

    // == Begin Write ==
    /// Spins until no other writer holds the gate, then claims it.
    ///
    /// The returned guard ends the write when dropped, so the gate is released
    /// on every exit path, unwinding included.
    pub fn begin_write(&self) -> WriteGuard<'_> {
        let backoff = Backoff::new();
        while self
            .writing
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            backoff.snooze();
        }
        WriteGuard { gate: self }
    }

    // == Await Quiescent Write ==
    /// Spins while a write is in progress, without acquiring the gate.
    pub fn await_quiescent_write(&self) {
        let backoff = Backoff::new();
        while self.writing.load(Ordering::Acquire) {
            backoff.snooze();
        }
    }

    /// Returns true while a writer holds the gate.
    pub fn is_writing(&self) -> bool {
        self.writing.load(Ordering::Acquire)
    }

    fn end_write(&self) {
        self.writing.store(false, Ordering::Release);
    }
}

// == Guards ==
/// Exclusive hold on an [`AccessGate`]; dropping it ends the write.
#[derive(Debug)]
#[must_use = "the write ends as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    gate: &'a AccessGate,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.gate.end_write();
    }
}
