// Package workers provides the periodic stats logger.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::metrics;
use crate::workers::ReapBackend;

use super::reaper::Counters as ReaperCounters;
use super::refresher::Counters as RefresherCounters;

/// Logs worker counters every `each` until shutdown.
pub async fn logger(
    shutdown_token: CancellationToken,
    backend: Arc<dyn ReapBackend>,
    refresher: Arc<RefresherCounters>,
    reaper: Arc<ReaperCounters>,
    each: Duration,
) {
    let mut ticker = interval(each);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => {
                tracing::debug!(component = "telemetry", "logger stopped");
                return;
            }
            _ = ticker.tick() => {
                let entries = backend.len();
                metrics::set_entries(entries);

                let (updated, errors, started, stopped) = refresher.reset();
                tracing::info!(
                    component = "refresher",
                    event = "stats",
                    active = refresher.active(),
                    updated,
                    errors,
                    started,
                    stopped,
                    "refresher stats"
                );

                let (sweeps, scanned, evicted, busy, stopping) = reaper.reset();
                tracing::info!(
                    component = "reaper",
                    event = "stats",
                    entries,
                    sweeps,
                    scanned,
                    evicted,
                    busy,
                    stopping,
                    "reaper stats"
                );
            }
        }
    }
}
