//! Entry store: one shared record per (type, key).

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::model::{Entry, EntryKey};

use super::Map;

/// Outcome of an explicit delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    Missing,
    /// A fetch or refresh loop still references the entry.
    Busy,
}

/// Per-pass statistics returned by [`Storage::sweep`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: i64,
    pub evicted: i64,
    /// Expired but a fetch is still outstanding.
    pub busy: i64,
    /// Expired with a refresh loop attached; the loop was told to stop.
    pub stopping: i64,
}

/// Storage owns every entry of the cache.
pub struct Storage {
    map: Map,
}

impl Storage {
    pub fn new() -> Self {
        Self { map: Map::new() }
    }

    /// Gets an entry by key without touching it.
    pub fn get(&self, key: &EntryKey) -> Option<Arc<Entry>> {
        self.map.get(key)
    }

    /// Returns the entry for `key`, creating an empty one when missing,
    /// and records the access.
    pub fn get_or_create(&self, key: EntryKey, ttl: Duration, now: Instant) -> Arc<Entry> {
        self.map.get_or_insert_with(key, now, |key| Entry::new(key, ttl, now))
    }

    /// Removes an entry unless something still depends on it.
    pub fn delete(&self, key: &EntryKey) -> Removal {
        let mut busy = false;
        let (removed, found) = self.map.remove_if(key, |entry| {
            let st = entry.lock();
            busy = st.fetching || st.refresh.is_some();
            !busy
        });
        match (removed, found) {
            (true, _) => Removal::Removed,
            (false, true) if busy => Removal::Busy,
            _ => Removal::Missing,
        }
    }

    /// Evicts entries idle past their TTL.
    ///
    /// An expired entry with a refresh loop gets its loop canceled and is
    /// removed on a later pass once the loop has detached itself. An expired
    /// entry with an outstanding fetch is skipped until the fetch lands.
    pub fn sweep(&self, token: &CancellationToken, now: Instant) -> SweepStats {
        let mut stats = SweepStats::default();
        let evicted = self.map.retain(token, |entry| {
            stats.scanned += 1;
            let st = entry.lock();
            if !entry.is_expired(&st, now) {
                return true;
            }
            if let Some(refresh) = &st.refresh {
                refresh.token.cancel();
                stats.stopping += 1;
                return true;
            }
            if st.fetching {
                stats.busy += 1;
                return true;
            }
            false
        });
        stats.evicted = evicted;
        stats
    }

    /// Visits every entry until `f` returns false.
    pub fn walk<F>(&self, token: &CancellationToken, mut f: F)
    where
        F: FnMut(&Arc<Entry>) -> bool,
    {
        let mut proceed = true;
        self.map.walk_shards(token, |_, shard| {
            if !proceed {
                return;
            }
            shard.walk_r(token, |_, entry| {
                proceed = f(entry);
                proceed
            });
        });
    }

    /// Drops every entry, canceling attached refresh loops.
    pub fn clear(&self) {
        let token = CancellationToken::new();
        self.walk(&token, |entry| {
            if let Some(refresh) = &entry.lock().refresh {
                refresh.token.cancel();
            }
            true
        });
        self.map.clear();
    }

    pub fn len(&self) -> i64 {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::workers::ReapBackend for Storage {
    fn len(&self) -> i64 {
        self.len()
    }

    fn sweep(&self, token: &CancellationToken, now: Instant) -> SweepStats {
        Storage::sweep(self, token, now)
    }
}
