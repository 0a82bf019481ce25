//! Background refresh loops, one per hot entry.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::backoff::Backoff;
use crate::metrics;
use crate::model::{Entry, Request};
use crate::workers::RefreshBackend;

use super::counters::Counters;

/// Everything a loop needs to keep one entry warm.
pub struct RefreshTask {
    pub entry: Arc<Entry>,
    pub type_name: String,
    pub request: Arc<dyn Request>,
    /// Canceled on eviction, supersession or shutdown.
    pub token: CancellationToken,
    /// Identifies this loop in the entry's refresh handle.
    pub generation: u64,
    /// Pause after a successful refresh.
    pub refresh_timer: Duration,
}

/// Refresher spawns and tracks refresh loops.
pub struct Refresher {
    tracker: TaskTracker,
    backoff: Backoff,
    counters: Arc<Counters>,
}

impl Refresher {
    pub fn new(tracker: TaskTracker, backoff: Backoff) -> Self {
        Self {
            tracker,
            backoff,
            counters: Arc::new(Counters::new()),
        }
    }

    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }

    /// Starts a loop for `task`. The caller must already have recorded the
    /// task's refresh handle on the entry.
    pub fn spawn(&self, backend: Arc<dyn RefreshBackend>, task: RefreshTask) {
        self.counters.started.fetch_add(1, Ordering::Relaxed);
        self.counters.active.fetch_add(1, Ordering::Relaxed);
        metrics::add_refresh_loops_started(1);

        let backoff = self.backoff;
        let counters = self.counters.clone();
        self.tracker.spawn(async move {
            run(backend.as_ref(), &task, backoff, &counters).await;
            backend.release(&task);

            counters.stopped.fetch_add(1, Ordering::Relaxed);
            counters.active.fetch_sub(1, Ordering::Relaxed);
            metrics::add_refresh_loops_stopped(1);
            debug!(
                component = "refresher",
                event = "stopped",
                key = %task.entry.key(),
                generation = task.generation,
                "refresh loop stopped"
            );
        });
    }
}

async fn run(backend: &dyn RefreshBackend, task: &RefreshTask, backoff: Backoff, counters: &Counters) {
    let mut failures: u32 = 0;
    loop {
        if task.token.is_cancelled() {
            return;
        }

        let outcome = tokio::select! {
            _ = task.token.cancelled() => return,
            outcome = backend.poll(task) => outcome,
        };

        let wait = match outcome {
            Ok(()) => {
                failures = 0;
                counters.success_updates.fetch_add(1, Ordering::Relaxed);
                task.refresh_timer
            }
            Err(err) if err.is_canceled() => return,
            Err(err) => {
                failures = failures.saturating_add(1);
                counters.error_updates.fetch_add(1, Ordering::Relaxed);
                metrics::add_refresh_errors(1);
                let wait = backoff.wait(failures);
                warn!(
                    component = "refresher",
                    event = "fetch_failed",
                    key = %task.entry.key(),
                    failures,
                    retry_in = %humantime::format_duration(wait),
                    error = %err,
                    "refresh failed"
                );
                wait
            }
        };

        if !wait.is_zero() {
            tokio::select! {
                _ = task.token.cancelled() => return,
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}
