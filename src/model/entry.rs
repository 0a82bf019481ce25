//! Cache entry models.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

use super::{FetchResult, RegisterOptions, RequestInfo, ResultMeta, Value};

/// EntryKey identifies one entry: `{type}/{datacenter}/{token}/{key}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey(String);

impl EntryKey {
    pub fn new(type_name: &str, datacenter: &str, token: &str, key: &str) -> Self {
        Self(format!("{type_name}/{datacenter}/{token}/{key}"))
    }

    pub fn from_info(type_name: &str, info: &RequestInfo) -> Self {
        Self::new(type_name, &info.datacenter, &info.token, &info.key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ownership record of the refresh loop attached to an entry.
#[derive(Debug)]
pub struct RefreshHandle {
    pub token: CancellationToken,
    pub generation: u64,
}

/// How a fetch outcome was integrated into an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// A new payload replaced the cached one.
    Updated,
    /// The cached payload was confirmed; only the index and timestamps moved.
    NotModified,
    /// The source index went backwards; the reply was accepted as a reset.
    Discontinuity,
    /// The reply lost a race against a newer prepopulate and was dropped.
    Stale,
    /// The fetch failed; the previous value is kept.
    Failed,
}

/// Mutable part of an entry. Only touched under the entry lock.
#[derive(Debug)]
pub struct EntryState {
    pub value: Option<Value>,
    pub index: u64,
    /// Set once a value has ever been stored.
    pub valid: bool,
    /// Outcome of the most recent fetch when it failed.
    pub error: Option<Error>,
    pub fetched_at: Option<Instant>,
    /// Single-flight token: a fetch for this entry is outstanding.
    pub fetching: bool,
    /// Index the outstanding fetch started from.
    pub fetch_floor: u64,
    /// Number of fetch outcomes applied so far.
    pub fetches: u64,
    pub refresh: Option<RefreshHandle>,
    /// First refresh failure since the last success.
    pub lost_contact: Option<Instant>,
    pub last_get: Instant,
}

impl EntryState {
    pub fn new(now: Instant) -> Self {
        Self {
            value: None,
            index: 0,
            valid: false,
            error: None,
            fetched_at: None,
            fetching: false,
            fetch_floor: 0,
            fetches: 0,
            refresh: None,
            lost_contact: None,
            last_get: now,
        }
    }

    /// Claims the single-flight token. Returns false when a fetch is already out.
    pub fn begin_fetch(&mut self) -> bool {
        if self.fetching {
            return false;
        }
        self.fetching = true;
        self.fetch_floor = self.index;
        true
    }

    /// Integrates the outcome of the outstanding fetch and releases the token.
    pub fn apply(&mut self, outcome: Result<FetchResult, Error>, now: Instant) -> Applied {
        self.fetching = false;
        self.fetches += 1;
        let floor = self.fetch_floor;

        let res = match outcome {
            Ok(res) => res,
            Err(err) => {
                let lost = !err.is_canceled();
                self.error = Some(err);
                if lost && self.refresh.is_some() && self.lost_contact.is_none() {
                    self.lost_contact = Some(now);
                }
                return Applied::Failed;
            }
        };

        if res.index < self.index && res.index >= floor {
            self.mark_contact();
            return Applied::Stale;
        }
        let discontinuity = res.index < floor;
        // Index 0 is never valid data; keep later fetches blocking.
        let index = res.index.max(1);

        if res.not_modified {
            if !self.valid {
                self.error = Some(Error::FetchFailed(Arc::new(anyhow::anyhow!(
                    "not-modified reply at index {} without a cached value",
                    res.index
                ))));
                return Applied::Failed;
            }
            self.index = index;
            self.fetched_at = Some(now);
            self.mark_contact();
            return if discontinuity { Applied::Discontinuity } else { Applied::NotModified };
        }

        let Some(value) = res.value else {
            self.error = Some(Error::FetchFailed(Arc::new(anyhow::anyhow!(
                "reply at index {} carried no value",
                res.index
            ))));
            return Applied::Failed;
        };

        self.value = Some(value);
        self.index = index;
        self.valid = true;
        self.fetched_at = Some(now);
        self.mark_contact();
        if discontinuity {
            Applied::Discontinuity
        } else {
            Applied::Updated
        }
    }

    /// Seeds the entry with a value obtained elsewhere.
    pub fn prepopulate(&mut self, value: Value, index: u64, now: Instant) -> Result<(), Error> {
        if self.valid && index < self.index {
            return Err(Error::Regression { current: self.index, offered: index });
        }
        self.value = Some(value);
        self.index = index.max(1);
        self.valid = true;
        self.fetched_at = Some(now);
        self.error = None;
        Ok(())
    }

    /// Reports whether the cached value answers `info` without fetching.
    pub fn is_hit(&self, info: &RequestInfo, opts: &RegisterOptions, first: bool, now: Instant) -> bool {
        if !self.valid {
            return false;
        }
        if opts.supports_blocking && info.min_index > 0 && info.min_index >= self.index {
            return false;
        }
        if !info.max_age.is_zero() {
            let since = if opts.refresh { self.lost_contact } else { self.fetched_at };
            if since.is_some_and(|at| now.saturating_duration_since(at) > info.max_age) {
                return false;
            }
        }
        !(first && info.must_revalidate && !opts.refresh)
    }

    /// The cached value, once one was ever stored.
    pub fn current(&self) -> Option<Value> {
        if self.valid {
            self.value.clone()
        } else {
            None
        }
    }

    /// Builds the metadata for an answer served from this state.
    pub fn meta(&self, refresh: bool, hit: bool, now: Instant) -> ResultMeta {
        let since = if refresh { self.lost_contact } else { self.fetched_at };
        ResultMeta {
            index: self.index,
            hit,
            age: since.map(|at| now.saturating_duration_since(at)).unwrap_or(Duration::ZERO),
            last_fetched: self.fetched_at,
        }
    }

    fn mark_contact(&mut self) {
        self.error = None;
        self.lost_contact = None;
    }
}

/// Entry is the per-(type, key) record shared by callers, fetches and workers.
pub struct Entry {
    key: EntryKey,
    ttl: Duration,
    state: Mutex<EntryState>,
    waiter: watch::Sender<u64>,
}

impl Entry {
    pub fn new(key: EntryKey, ttl: Duration, now: Instant) -> Self {
        let (waiter, _) = watch::channel(0);
        Self {
            key,
            ttl,
            state: Mutex::new(EntryState::new(now)),
            waiter,
        }
    }

    pub fn key(&self) -> &EntryKey {
        &self.key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn lock(&self) -> MutexGuard<'_, EntryState> {
        self.state.lock()
    }

    /// Registers interest in the next update.
    ///
    /// Subscribe while holding the entry lock so an update applied right
    /// after the lock is released is never missed.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.waiter.subscribe()
    }

    /// Releases every waiter registered so far.
    pub fn notify_waiters(&self) {
        self.waiter.send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    /// Records a caller access.
    pub fn touch(&self, now: Instant) {
        self.state.lock().last_get = now;
    }

    /// Reports whether the entry has been idle past its TTL.
    pub fn is_expired(&self, state: &EntryState, now: Instant) -> bool {
        now.saturating_duration_since(state.last_get) > self.ttl
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry").field("key", &self.key).field("ttl", &self.ttl).finish()
    }
}
