//! Query Cache - memoize query and aggregate results with a time-to-live.
//!
//! Entries are keyed by operation name, dataset id and the serialized
//! arguments. The cache is advisory: a miss (or a disabled cache) recomputes
//! the exact same value.

use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Default time-to-live (one hour)
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Default maximum number of entries
const DEFAULT_MAX_ENTRIES: usize = 256;

/// Identity of a cached computation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Operation name (e.g. "filter", "metrics")
    pub op: &'static str,
    /// Dataset the operation ran on
    pub dataset: Uuid,
    /// Arguments, serialized as JSON
    pub args: String,
}

impl CacheKey {
    pub fn new<A: Serialize>(op: &'static str, dataset: Uuid, args: &A) -> serde_json::Result<Self> {
        Ok(Self {
            op,
            dataset,
            args: serde_json::to_string(args)?,
        })
    }
}

/// A cached value with its insertion time
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// Hit / miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// TTL cache for query results
#[derive(Debug)]
pub struct QueryCache<V> {
    /// Time-to-live; `None` disables caching entirely
    ttl: Option<Duration>,
    /// Maximum entries kept before expired ones are purged and the oldest evicted
    max_entries: usize,
    entries: HashMap<CacheKey, CacheEntry<V>>,
    hits: u64,
    misses: u64,
}

impl<V: Clone> QueryCache<V> {
    /// Create a cache with the given time-to-live
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            max_entries: DEFAULT_MAX_ENTRIES,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self {
            ttl: None,
            ..Self::new(DEFAULT_TTL)
        }
    }

    /// Set the maximum number of entries
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Look up a live entry
    pub fn get(&mut self, key: &CacheKey) -> Option<V> {
        let Some(ttl) = self.ttl else {
            self.misses += 1;
            return None;
        };

        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(ttl) => {
                self.hits += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                self.entries.remove(key);
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a value
    pub fn insert(&mut self, key: CacheKey, value: V) {
        let Some(ttl) = self.ttl else {
            return;
        };

        if self.entries.len() >= self.max_entries {
            self.entries.retain(|_, e| !e.is_expired(ttl));
        }
        if self.entries.len() >= self.max_entries {
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&oldest);
            }
        }

        self.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    /// Return the cached value or compute, store and return it
    pub fn get_or_compute(&mut self, key: CacheKey, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Drop every entry computed on another dataset
    pub fn retain_dataset(&mut self, dataset: Uuid) {
        self.entries.retain(|k, _| k.dataset == dataset);
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

impl<V: Clone> Default for QueryCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
