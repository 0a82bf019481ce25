//! Sharded concurrent map of cache entries.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use xxhash_rust::xxh3::xxh3_64;

use crate::model::{Entry, EntryKey};

use super::shard::Shard;

/// Number of shards in the map.
pub const NUM_OF_SHARDS: usize = 256;
pub const SHARD_MASK: u64 = (NUM_OF_SHARDS - 1) as u64;

/// Map is a sharded concurrent map with a precise global length.
pub struct Map {
    pub(crate) len: AtomicI64,
    pub(crate) shards: Vec<Shard>,
}

impl Map {
    /// Creates a new sharded map.
    pub fn new() -> Self {
        let mut shards = Vec::with_capacity(NUM_OF_SHARDS);
        for id in 0..NUM_OF_SHARDS {
            shards.push(Shard::new(id as u64));
        }
        Self {
            len: AtomicI64::new(0),
            shards,
        }
    }

    /// Gets an entry by key.
    pub fn get(&self, key: &EntryKey) -> Option<Arc<Entry>> {
        self.shard(key).get(key)
    }

    /// Gets or creates an entry, recording the access time.
    pub fn get_or_insert_with<F>(&self, key: EntryKey, now: Instant, create: F) -> Arc<Entry>
    where
        F: FnOnce(EntryKey) -> Entry,
    {
        let (entry, created) = self.shard(&key).get_or_insert_with(key, now, create);
        if created {
            self.len.fetch_add(1, Ordering::Relaxed);
        }
        entry
    }

    /// Removes a key when `allow` agrees. Returns (removed, found).
    pub fn remove_if<F>(&self, key: &EntryKey, allow: F) -> (bool, bool)
    where
        F: FnOnce(&Arc<Entry>) -> bool,
    {
        let (removed, found) = self.shard(key).remove_if(key, allow);
        if removed {
            self.len.fetch_sub(1, Ordering::Relaxed);
        }
        (removed, found)
    }

    /// Runs `keep` over every entry, dropping those it rejects.
    /// Returns the number of removed entries.
    pub fn retain<F>(&self, token: &CancellationToken, mut keep: F) -> i64
    where
        F: FnMut(&Arc<Entry>) -> bool,
    {
        let mut removed = 0;
        self.walk_shards(token, |_, shard| {
            removed += shard.retain(&mut keep);
        });
        if removed != 0 {
            self.len.fetch_sub(removed, Ordering::Relaxed);
        }
        removed
    }

    /// Walks over all shards synchronously.
    pub fn walk_shards<F>(&self, token: &CancellationToken, mut f: F)
    where
        F: FnMut(u64, &Shard),
    {
        for (idx, shard) in self.shards.iter().enumerate() {
            if token.is_cancelled() {
                return;
            }
            f(idx as u64, shard);
        }
    }

    /// Clears all shards.
    pub fn clear(&self) {
        for shard in &self.shards {
            let items = shard.clear();
            if items != 0 {
                self.len.fetch_sub(items, Ordering::Relaxed);
            }
        }
    }

    /// Gets the shard for a given key.
    pub fn shard(&self, key: &EntryKey) -> &Shard {
        let hash = xxh3_64(key.as_str().as_bytes());
        &self.shards[(hash & SHARD_MASK) as usize]
    }

    /// Gets the number of items.
    pub fn len(&self) -> i64 {
        self.len.load(Ordering::Relaxed)
    }

    /// Checks if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}
