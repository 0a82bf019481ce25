//! The cache façade.

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::backoff::Backoff;
use crate::config::{Config, ConfigTrait};
use crate::db::Storage;
use crate::error::Error;
use crate::model::{EntryKey, FetchResult, Fetcher, Request, ResultMeta, Value};
use crate::workers::{telemetry, ReapBackend, Reaper, Refresher};

use super::types::RegisteredType;

/// Cache is a client-side cache in front of blocking (long-poll) queries.
///
/// Callers identify data by a registered type name and a request value. The
/// cache answers from memory when it can, coalesces concurrent misses into one
/// fetch per entry, and keeps entries of refreshing types warm in the
/// background until they go idle.
///
/// Dropping the cache cancels all background work; [`Cache::close`] also
/// waits for it to finish.
pub struct Cache {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) cfg: Config,
    pub(crate) types: DashMap<String, Arc<RegisteredType>>,
    pub(crate) storage: Arc<Storage>,
    pub(crate) shutdown: CancellationToken,
    pub(crate) tracker: TaskTracker,
    pub(crate) refresher: Refresher,
    /// Source of refresh loop generations.
    pub(crate) generation: AtomicU64,
    /// Retry pacing for notify loops.
    pub(crate) backoff: Backoff,
}

impl Cache {
    /// Creates a cache and starts its background workers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(cfg: Config) -> Self {
        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();
        let storage = Arc::new(Storage::new());
        let backoff = cfg.backoff();
        let refresher = Refresher::new(tracker.clone(), backoff);

        let reaper = Reaper::new(
            shutdown.clone(),
            storage.clone() as Arc<dyn ReapBackend>,
            cfg.reaper_interval(),
        );
        tracker.spawn(telemetry::logger(
            shutdown.clone(),
            storage.clone() as Arc<dyn ReapBackend>,
            refresher.counters(),
            reaper.counters(),
            cfg.stats_interval(),
        ));
        if cfg.reaper_enabled() {
            tracker.spawn(reaper.run());
        }

        info!(
            component = "cache",
            event = "started",
            ttl = %humantime::format_duration(cfg.entry_ttl()),
            query_timeout = %humantime::format_duration(cfg.query_timeout()),
            reaper = cfg.reaper_enabled(),
            "cache started"
        );

        Self {
            inner: Arc::new(Inner {
                cfg,
                types: DashMap::new(),
                storage,
                shutdown,
                tracker,
                refresher,
                generation: AtomicU64::new(0),
                backoff,
            }),
        }
    }

    /// Registers the fetcher serving `name`.
    ///
    /// Registering the same name twice is a configuration error.
    pub fn register_type(&self, name: impl Into<String>, fetcher: Arc<dyn Fetcher>) -> Result<(), Error> {
        let name = name.into();
        match self.inner.types.entry(name.clone()) {
            MapEntry::Occupied(_) => Err(Error::DuplicateType(name)),
            MapEntry::Vacant(slot) => {
                let tentry = RegisteredType::new(name.clone(), fetcher, &self.inner.cfg);
                debug!(
                    component = "cache",
                    event = "registered",
                    type_name = %name,
                    refresh = tentry.opts.refresh,
                    blocking = tentry.opts.supports_blocking,
                    "type registered"
                );
                slot.insert(Arc::new(tentry));
                Ok(())
            }
        }
    }

    /// Returns the value for `req`, fetching it when the cache cannot answer.
    ///
    /// With a non-zero `min_index` the call blocks until the entry moves past
    /// that index, one fetch completes, or the wait bound (`max_wait`, or the
    /// type's query timeout) elapses. On elapse the current value is returned
    /// with `hit == false`. Canceling `ctx` detaches this caller only; the
    /// shared fetch keeps running.
    pub async fn get<R: Request>(
        &self,
        ctx: &CancellationToken,
        type_name: &str,
        req: R,
    ) -> Result<(Value, ResultMeta), Error> {
        let tentry = self.inner.registered(type_name)?;
        if !tentry.fetcher.accepts(&req) {
            return Err(Error::WrongRequestType(std::any::type_name::<R>().to_string()));
        }
        let info = req.cache_info();
        self.inner.get_with_index(ctx, tentry, Arc::new(req), info).await
    }

    /// Seeds an entry with a result obtained outside the cache.
    pub fn prepopulate(
        &self,
        type_name: &str,
        result: FetchResult,
        datacenter: &str,
        token: &str,
        key: &str,
    ) -> Result<(), Error> {
        let tentry = self.inner.registered(type_name)?;
        let value = result.value.ok_or(Error::EmptyValue)?;

        let now = Instant::now();
        let entry = self
            .inner
            .storage
            .get_or_create(EntryKey::new(type_name, datacenter, token, key), tentry.ttl, now);

        let mut st = entry.lock();
        st.prepopulate(value, result.index, now)?;
        entry.notify_waiters();
        debug!(
            component = "cache",
            event = "prepopulated",
            key = %entry.key(),
            index = st.index,
            "entry prepopulated"
        );
        Ok(())
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> i64 {
        self.inner.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.storage.is_empty()
    }

    /// Stops every background task, waits for them to exit and drops every entry.
    ///
    /// Blocked `get` calls return [`Error::Canceled`].
    pub async fn close(&self) {
        self.inner.shutdown.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        let entries = self.inner.storage.len();
        self.inner.storage.clear();
        info!(component = "cache", event = "closed", entries, "cache closed");
    }

    pub(crate) fn inner(&self) -> &Arc<Inner> {
        &self.inner
    }
}

impl Drop for Cache {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

impl Inner {
    pub(crate) fn registered(&self, type_name: &str) -> Result<Arc<RegisteredType>, Error> {
        self.types
            .get(type_name)
            .map(|t| t.value().clone())
            .ok_or_else(|| Error::UnregisteredType(type_name.to_string()))
    }
}
