//! Refresh loop ownership.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::error::Error;
use crate::model::{Entry, EntryState, FetchOptions, RefreshHandle, Request};
use crate::workers::{RefreshBackend, RefreshTask};

use super::cache::Inner;
use super::types::RegisteredType;

impl Inner {
    /// Attaches a refresh loop to the entry unless a live one owns it.
    ///
    /// Must be called with the entry lock held, which makes the check and the
    /// start atomic.
    pub(crate) fn ensure_refresh(
        self: &Arc<Self>,
        tentry: &RegisteredType,
        entry: &Arc<Entry>,
        st: &mut EntryState,
        req: &Arc<dyn Request>,
    ) {
        if !tentry.opts.refresh || self.shutdown.is_cancelled() {
            return;
        }
        // A canceled handle belongs to a loop on its way out; supersede it.
        if st.refresh.as_ref().is_some_and(|h| !h.token.is_cancelled()) {
            return;
        }

        let token = self.shutdown.child_token();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        st.refresh = Some(RefreshHandle {
            token: token.clone(),
            generation,
        });

        let backend: Arc<dyn RefreshBackend> = self.clone();
        self.refresher.spawn(
            backend,
            RefreshTask {
                entry: entry.clone(),
                type_name: tentry.name.clone(),
                request: req.clone(),
                token,
                generation,
                refresh_timer: tentry.opts.refresh_timer,
            },
        );
    }
}

#[async_trait::async_trait]
impl RefreshBackend for Inner {
    async fn poll(&self, task: &RefreshTask) -> Result<(), Error> {
        let tentry = self.registered(&task.type_name)?;

        let (mut rx, seen) = {
            let mut st = task.entry.lock();
            if task.token.is_cancelled() || !owns(&st, task.generation) {
                return Err(Error::canceled());
            }
            let info = task.request.cache_info();
            let opts = FetchOptions {
                min_index: if tentry.opts.supports_blocking { st.index } else { 0 },
                max_wait: tentry.query_timeout,
                allow_stale: info.allow_stale,
                allow_not_modified: info.allow_not_modified && st.valid,
            };
            let rx = task.entry.subscribe();
            let seen = st.fetches;
            self.start_fetch(
                &tentry,
                &task.entry,
                &mut st,
                task.request.clone(),
                opts,
                Some(task.token.clone()),
            );
            (rx, seen)
        };

        loop {
            if rx.changed().await.is_err() {
                return Err(Error::canceled());
            }
            let st = task.entry.lock();
            if st.fetches != seen {
                return match &st.error {
                    Some(err) => Err(err.clone()),
                    None => Ok(()),
                };
            }
        }
    }

    fn release(&self, task: &RefreshTask) {
        let mut st = task.entry.lock();
        if owns(&st, task.generation) {
            st.refresh = None;
            st.lost_contact = None;
        }
    }
}

fn owns(st: &EntryState, generation: u64) -> bool {
    st.refresh.as_ref().is_some_and(|h| h.generation == generation)
}
