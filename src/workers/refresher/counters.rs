// Package refresher provides counters for background refresh loops.

use std::sync::atomic::{AtomicI64, Ordering};

/// Counters for refresh loops.
pub struct Counters {
    /// Refresh fetches applied without error.
    pub success_updates: AtomicI64,
    /// Refresh fetches that failed.
    pub error_updates: AtomicI64,
    /// Loops started.
    pub started: AtomicI64,
    /// Loops that exited.
    pub stopped: AtomicI64,
    /// Loops currently attached to an entry.
    pub active: AtomicI64,
}

impl Counters {
    /// Creates new counters.
    pub fn new() -> Self {
        Self {
            success_updates: AtomicI64::new(0),
            error_updates: AtomicI64::new(0),
            started: AtomicI64::new(0),
            stopped: AtomicI64::new(0),
            active: AtomicI64::new(0),
        }
    }

    /// Resets the per-interval counters and returns their previous values
    /// as (updated, errors, started, stopped). `active` is a level, not reset.
    pub fn reset(&self) -> (i64, i64, i64, i64) {
        let updated = self.success_updates.swap(0, Ordering::Relaxed);
        let errors = self.error_updates.swap(0, Ordering::Relaxed);
        let started = self.started.swap(0, Ordering::Relaxed);
        let stopped = self.stopped.swap(0, Ordering::Relaxed);
        (updated, errors, started, stopped)
    }

    pub fn active(&self) -> i64 {
        self.active.load(Ordering::Relaxed)
    }
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}
