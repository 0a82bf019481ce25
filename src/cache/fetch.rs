//! Single-flight fetches.

use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Error;
use crate::metrics;
use crate::model::{Applied, Entry, EntryState, FetchOptions, FetchResult, Request};

use super::cache::Inner;
use super::types::RegisteredType;

impl Inner {
    /// Starts a fetch for `entry` unless one is already outstanding.
    ///
    /// Must be called with the entry lock held (`st`). The fetcher runs on its
    /// own task so that no lock is held while it blocks, and so that callers
    /// giving up never cancel it. A fetch owned by a refresh loop passes the
    /// loop's token as `owner` and ends with the loop. Returns whether a new
    /// fetch was started.
    pub(crate) fn start_fetch(
        &self,
        tentry: &Arc<RegisteredType>,
        entry: &Arc<Entry>,
        st: &mut EntryState,
        req: Arc<dyn Request>,
        opts: FetchOptions,
        owner: Option<CancellationToken>,
    ) -> bool {
        if self.shutdown.is_cancelled() || !st.begin_fetch() {
            return false;
        }

        debug!(
            component = "cache",
            event = "fetch",
            key = %entry.key(),
            min_index = opts.min_index,
            max_wait = ?opts.max_wait,
            "fetch started"
        );

        let stop = owner.unwrap_or_else(|| self.shutdown.clone());
        let tentry = Arc::clone(tentry);
        let entry = Arc::clone(entry);
        self.tracker.spawn(async move {
            let outcome = tokio::select! {
                _ = stop.cancelled() => Err(Error::canceled()),
                res = tentry.fetcher.fetch(opts, req) => res.map_err(Error::from_fetch),
            };
            complete_fetch(&entry, outcome);
        });
        true
    }
}

/// Applies a fetch outcome and releases every waiter of the entry.
fn complete_fetch(entry: &Entry, outcome: Result<FetchResult, Error>) {
    let mut st = entry.lock();
    let applied = st.apply(outcome, Instant::now());
    entry.notify_waiters();

    let index = st.index;
    match applied {
        Applied::Updated => metrics::add_fetch_success(1),
        Applied::NotModified => metrics::add_fetch_not_modified(1),
        Applied::Discontinuity => {
            metrics::add_fetch_success(1);
            debug!(
                component = "cache",
                event = "discontinuity",
                key = %entry.key(),
                floor = st.fetch_floor,
                index,
                "source index went backwards, accepted reset"
            );
        }
        Applied::Stale => {
            debug!(
                component = "cache",
                event = "stale_reply",
                key = %entry.key(),
                index,
                "reply behind cached index dropped"
            );
        }
        Applied::Failed => {
            if let Some(err) = st.error.as_ref().filter(|e| !e.is_canceled()) {
                metrics::add_fetch_errors(1);
                warn!(
                    component = "cache",
                    event = "fetch_failed",
                    key = %entry.key(),
                    index,
                    error = %err,
                    "fetch failed"
                );
            }
        }
    }
}
