// Package reaper provides counters for TTL sweeps.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::db::SweepStats;

/// Counters for the reaper.
pub struct Counters {
    pub sweeps: AtomicI64,
    pub scanned: AtomicI64,
    pub evicted: AtomicI64,
    /// Expired entries skipped because a fetch was outstanding.
    pub busy: AtomicI64,
    /// Expired entries whose refresh loop was told to stop.
    pub stopping: AtomicI64,
}

impl Counters {
    /// Creates new counters.
    pub fn new() -> Self {
        Self {
            sweeps: AtomicI64::new(0),
            scanned: AtomicI64::new(0),
            evicted: AtomicI64::new(0),
            busy: AtomicI64::new(0),
            stopping: AtomicI64::new(0),
        }
    }

    /// Accumulates one sweep.
    pub fn record(&self, stats: &SweepStats) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.scanned.fetch_add(stats.scanned, Ordering::Relaxed);
        self.evicted.fetch_add(stats.evicted, Ordering::Relaxed);
        self.busy.fetch_add(stats.busy, Ordering::Relaxed);
        self.stopping.fetch_add(stats.stopping, Ordering::Relaxed);
    }

    /// Resets all counters and returns their previous values
    /// as (sweeps, scanned, evicted, busy, stopping).
    pub fn reset(&self) -> (i64, i64, i64, i64, i64) {
        let sweeps = self.sweeps.swap(0, Ordering::Relaxed);
        let scanned = self.scanned.swap(0, Ordering::Relaxed);
        let evicted = self.evicted.swap(0, Ordering::Relaxed);
        let busy = self.busy.swap(0, Ordering::Relaxed);
        let stopping = self.stopping.swap(0, Ordering::Relaxed);
        (sweeps, scanned, evicted, busy, stopping)
    }
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}
