//! Blocking reads.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::metrics;
use crate::model::{Entry, EntryKey, EntryState, FetchOptions, Request, RequestInfo, ResultMeta, Value};

use super::cache::Inner;
use super::types::RegisteredType;

impl Inner {
    /// Answers `info` from the entry, starting or joining a fetch as needed.
    pub(crate) async fn get_with_index(
        self: &Arc<Self>,
        ctx: &CancellationToken,
        tentry: Arc<RegisteredType>,
        req: Arc<dyn Request>,
        info: RequestInfo,
    ) -> Result<(Value, ResultMeta), Error> {
        let key = EntryKey::from_info(&tentry.name, &info);
        let entry = self.storage.get_or_create(key, tentry.ttl, Instant::now());

        let wait = if info.max_wait.is_zero() { tentry.query_timeout } else { info.max_wait };
        let deadline = tokio::time::Instant::now() + wait;

        let mut first = true;
        // Fetch outcomes applied when this caller started its own fetch.
        let mut own: Option<u64> = None;
        loop {
            let mut rx = {
                let mut st = entry.lock();
                let now = Instant::now();

                if st.is_hit(&info, &tentry.opts, first, now) {
                    if let Some(answer) = self.answer(&tentry, &entry, &mut st, &req, first, now) {
                        if first {
                            metrics::add_hits(1);
                        }
                        return Ok(answer);
                    }
                }

                // The fetch this caller started has landed: report it rather
                // than fetching again until the wait bound. A fetch merely
                // joined may have been bounded by someone else's wait.
                if own.is_some_and(|seen| seen != st.fetches) {
                    if let Some(err) = &st.error {
                        return Err(err.clone());
                    }
                    if let Some(answer) = self.answer(&tentry, &entry, &mut st, &req, false, now) {
                        return Ok(answer);
                    }
                }

                let rx = entry.subscribe();
                let opts = fetch_options(&tentry, &st, &info, wait);
                let seen = st.fetches;
                if self.start_fetch(&tentry, &entry, &mut st, req.clone(), opts, None) {
                    own = Some(seen);
                }
                rx
            };

            if first {
                metrics::add_misses(1);
                first = false;
            }

            tokio::select! {
                _ = ctx.cancelled() => return Err(canceled(&entry)),
                _ = self.shutdown.cancelled() => return Err(canceled(&entry)),
                _ = tokio::time::sleep_until(deadline) => {
                    return self.expired(&tentry, &entry, &req, wait);
                }
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Err(canceled(&entry));
                    }
                }
            }
        }
    }

    /// Builds the answer from a valid entry and makes sure a refresh loop
    /// owns it when the type refreshes.
    fn answer(
        self: &Arc<Self>,
        tentry: &RegisteredType,
        entry: &Arc<Entry>,
        st: &mut EntryState,
        req: &Arc<dyn Request>,
        hit: bool,
        now: Instant,
    ) -> Option<(Value, ResultMeta)> {
        let value = st.current()?;
        let meta = st.meta(tentry.opts.refresh, hit, now);
        self.ensure_refresh(tentry, entry, st, req);
        Some((value, meta))
    }

    /// The wait bound elapsed: hand out whatever is cached.
    fn expired(
        self: &Arc<Self>,
        tentry: &RegisteredType,
        entry: &Arc<Entry>,
        req: &Arc<dyn Request>,
        wait: Duration,
    ) -> Result<(Value, ResultMeta), Error> {
        let mut st = entry.lock();
        self.answer(tentry, entry, &mut st, req, false, Instant::now())
            .ok_or(Error::Timeout(wait))
    }
}

fn fetch_options(tentry: &RegisteredType, st: &EntryState, info: &RequestInfo, wait: Duration) -> FetchOptions {
    FetchOptions {
        min_index: if tentry.opts.supports_blocking { st.index.max(info.min_index) } else { 0 },
        max_wait: wait,
        allow_stale: info.allow_stale,
        allow_not_modified: info.allow_not_modified && st.valid,
    }
}

fn canceled(entry: &Entry) -> Error {
    let st = entry.lock();
    match st.current() {
        Some(value) => Error::Canceled { stale: Some(value), index: st.index },
        None => Error::canceled(),
    }
}
