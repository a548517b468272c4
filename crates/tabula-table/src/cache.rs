use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tabula_types::Address;

use crate::index::TableIndex;

/// Configuration for the [`IndexCache`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexCacheConfig {
    /// Maximum number of table indexes held; `None` for no limit.
    pub capacity: Option<usize>,
    /// Number of independently locked shards.
    pub shards: usize,
}

impl Default for IndexCacheConfig {
    fn default() -> Self {
        Self {
            capacity: Some(1024),
            shards: 16,
        }
    }
}

/// Process-wide cache of parsed table indexes keyed by table address.
///
/// Entries are immutable `Arc<TableIndex>` handles, so evicting one never
/// affects a reader that already holds it. Keys are spread over shards with
/// their own lock; lookups for tables in different shards never contend.
/// Two callers racing on one table may both parse it and both `put`; the
/// last write wins and both indexes compare equal.
pub struct IndexCache {
    shards: Vec<Mutex<LruCache<Address, Arc<TableIndex>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Counters for monitoring cache effectiveness.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of lookups served from the cache (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl IndexCache {
    pub fn new(config: &IndexCacheConfig) -> Self {
        let shard_count = config.shards.max(1);
        let shards = (0..shard_count)
            .map(|_| {
                let cache = match config.capacity {
                    Some(capacity) => {
                        let per_shard = capacity.div_ceil(shard_count);
                        LruCache::new(NonZeroUsize::new(per_shard).unwrap_or(NonZeroUsize::MIN))
                    }
                    None => LruCache::unbounded(),
                };
                Mutex::new(cache)
            })
            .collect();
        Self {
            shards,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// A cache that never evicts.
    pub fn unbounded() -> Self {
        Self::new(&IndexCacheConfig {
            capacity: None,
            ..IndexCacheConfig::default()
        })
    }

    fn shard(&self, table: &Address) -> &Mutex<LruCache<Address, Arc<TableIndex>>> {
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&table.as_bytes()[..8]);
        let slot = u64::from_be_bytes(prefix) % self.shards.len() as u64;
        &self.shards[slot as usize]
    }

    /// Look up a table's index, marking it most recently used.
    pub fn get(&self, table: &Address) -> Option<Arc<TableIndex>> {
        let found = self
            .shard(table)
            .lock()
            .expect("lock poisoned")
            .get(table)
            .cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn put(&self, table: Address, index: Arc<TableIndex>) {
        self.shard(&table)
            .lock()
            .expect("lock poisoned")
            .put(table, index);
    }

    /// Check for an entry without touching recency or counters.
    pub fn contains(&self, table: &Address) -> bool {
        self.shard(table).lock().expect("lock poisoned").contains(table)
    }

    pub fn remove(&self, table: &Address) -> Option<Arc<TableIndex>> {
        self.shard(table).lock().expect("lock poisoned").pop(table)
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().expect("lock poisoned").len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        for shard in &self.shards {
            shard.lock().expect("lock poisoned").clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new(&IndexCacheConfig::default())
    }
}

impl std::fmt::Debug for IndexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexCache")
            .field("shards", &self.shards.len())
            .field("entries", &self.len())
            .finish()
    }
}
