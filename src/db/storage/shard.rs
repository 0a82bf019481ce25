//! Shard implementation.
//

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::model::{Entry, EntryKey};

/// Shard is an independent segment of the sharded map.
pub struct Shard {
    pub(crate) items: RwLock<HashMap<EntryKey, Arc<Entry>>>,
    #[allow(dead_code)]
    id: u64,
    len: AtomicI64,
}

impl Shard {
    /// Creates a new shard.
    pub fn new(id: u64) -> Self {
        const INITIAL_CAPACITY: usize = 16;
        Self {
            items: RwLock::new(HashMap::with_capacity(INITIAL_CAPACITY)),
            id,
            len: AtomicI64::new(0),
        }
    }

    /// Gets the number of items.
    pub fn len(&self) -> i64 {
        self.len.load(Ordering::Relaxed)
    }

    /// Gets an entry by key.
    pub fn get(&self, key: &EntryKey) -> Option<Arc<Entry>> {
        self.items.read().get(key).cloned()
    }

    /// Returns the entry for `key`, creating it with `create` when missing.
    /// The access time is recorded while the shard is still locked, so a
    /// concurrent sweep never evicts an entry a caller just obtained.
    /// Returns the entry and whether it was created.
    pub fn get_or_insert_with<F>(&self, key: EntryKey, now: Instant, create: F) -> (Arc<Entry>, bool)
    where
        F: FnOnce(EntryKey) -> Entry,
    {
        let mut items = self.items.write();
        if let Some(existing) = items.get(&key) {
            existing.touch(now);
            return (existing.clone(), false);
        }
        let entry = Arc::new(create(key.clone()));
        items.insert(key, entry.clone());
        self.len.fetch_add(1, Ordering::Relaxed);
        (entry, true)
    }

    /// Removes a key when `allow` agrees. Returns (removed, found).
    pub fn remove_if<F>(&self, key: &EntryKey, allow: F) -> (bool, bool)
    where
        F: FnOnce(&Arc<Entry>) -> bool,
    {
        let mut items = self.items.write();
        let Some(entry) = items.get(key) else {
            return (false, false);
        };
        if !allow(entry) {
            return (false, true);
        }
        items.remove(key);
        self.len.fetch_sub(1, Ordering::Relaxed);
        (true, true)
    }

    /// Keeps only the entries for which `keep` returns true.
    /// Returns the number of removed entries.
    pub fn retain<F>(&self, mut keep: F) -> i64
    where
        F: FnMut(&Arc<Entry>) -> bool,
    {
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|_, entry| keep(entry));
        let removed = (before - items.len()) as i64;
        if removed != 0 {
            self.len.fetch_sub(removed, Ordering::Relaxed);
        }
        removed
    }

    /// Clears all entries.
    /// Returns items removed.
    pub fn clear(&self) -> i64 {
        let mut items = self.items.write();
        let removed = items.len() as i64;
        items.clear();
        self.len.store(0, Ordering::Relaxed);
        removed
    }

    /// Walks over items with a read lock.
    pub fn walk_r<F>(&self, token: &CancellationToken, mut f: F)
    where
        F: FnMut(&EntryKey, &Arc<Entry>) -> bool,
    {
        if token.is_cancelled() {
            return;
        }
        let items = self.items.read();
        for (k, v) in items.iter() {
            if token.is_cancelled() {
                return;
            }
            if !f(k, v) {
                return;
            }
        }
    }
}
