//! Length-sharded memo table for generated identifiers.
//!
//! Identifiers are pure functions of `(length, index)`, so the cache only
//! needs to make concurrent first-writes safe, never consistent: two workers
//! racing on the same slot compute the same string and whichever insert lands
//! first is kept.

use parking_lot::RwLock;
use portable_atomic::{AtomicU64, Ordering};
use std::collections::HashMap;
use std::sync::Arc;

/// One width's worth of memoized identifiers.
#[derive(Default)]
struct Shard {
    entries: RwLock<HashMap<u64, Arc<str>>>,
}

/// Hit/miss counters for an [`IdentCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Concurrent `(length, index) -> identifier` cache, sharded by length.
///
/// Each shard has its own lock, so workers generating keys never contend with
/// workers reading field or member identifiers of a different width. Entries
/// are never overwritten once inserted.
#[derive(Default)]
pub struct IdentCache {
    shards: RwLock<HashMap<usize, Arc<Shard>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl IdentCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn shard(&self, length: usize) -> Arc<Shard> {
        if let Some(shard) = self.shards.read().get(&length) {
            return Arc::clone(shard);
        }
        Arc::clone(self.shards.write().entry(length).or_default())
    }

    /// Returns the cached identifier for `(length, index)`, computing it with
    /// `make` on a miss.
    ///
    /// `make` runs outside the shard lock. If another thread inserted the same
    /// slot in the meantime, its value wins and the freshly computed one is
    /// dropped.
    pub fn get_or_insert_with(
        &self,
        length: usize,
        index: u64,
        make: impl FnOnce() -> String,
    ) -> Arc<str> {
        let shard = self.shard(length);
        if let Some(id) = shard.entries.read().get(&index) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(id);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let fresh: Arc<str> = make().into();
        Arc::clone(shard.entries.write().entry(index).or_insert(fresh))
    }

    /// Looks up an identifier without computing it.
    pub fn get(&self, length: usize, index: u64) -> Option<Arc<str>> {
        let shards = self.shards.read();
        let shard = shards.get(&length)?;
        shard.entries.read().get(&index).cloned()
    }

    /// Total number of memoized identifiers across all shards.
    pub fn len(&self) -> usize {
        self.shards
            .read()
            .values()
            .map(|shard| shard.entries.read().len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct widths seen so far.
    pub fn shard_count(&self) -> usize {
        self.shards.read().len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        self.shards.write().clear();
    }
}
