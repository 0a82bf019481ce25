//! Periodic TTL sweeps.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::metrics;
use crate::workers::ReapBackend;

use super::counters::Counters;

/// Reaper evicts idle entries on a fixed interval.
pub struct Reaper {
    shutdown_token: CancellationToken,
    backend: Arc<dyn ReapBackend>,
    every: Duration,
    counters: Arc<Counters>,
}

impl Reaper {
    pub fn new(shutdown_token: CancellationToken, backend: Arc<dyn ReapBackend>, every: Duration) -> Self {
        Self {
            shutdown_token,
            backend,
            every,
            counters: Arc::new(Counters::new()),
        }
    }

    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }

    /// Runs until shutdown.
    pub async fn run(self) {
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    debug!(component = "reaper", event = "stopped", "reaper stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.sweep_once(Instant::now());
                }
            }
        }
    }

    /// Runs one sweep.
    pub fn sweep_once(&self, now: Instant) {
        let stats = self.backend.sweep(&self.shutdown_token, now);
        self.counters.record(&stats);
        if stats.evicted > 0 {
            metrics::add_reaper_evicted(stats.evicted as u64);
            debug!(
                component = "reaper",
                event = "evicted",
                evicted = stats.evicted,
                remaining = self.backend.len(),
                "expired entries evicted"
            );
        }
        if stats.busy > 0 {
            metrics::add_reaper_busy(stats.busy as u64);
        }
    }
}
