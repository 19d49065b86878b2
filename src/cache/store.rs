//! TTL Store Module
//!
//! Key to entry map with lazy expiry and regex-based invalidation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use regex::Regex;

use crate::cache::{CacheEntry, CacheStats};

// == TTL Store ==
/// Holds cache entries and answers freshness queries.
///
/// Expired entries are only removed when a `get` touches them or an
/// invalidation hits them; there is no background sweep.
#[derive(Debug)]
pub struct TtlStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Lifetime applied when a caller gives none
    default_ttl: Duration,
}

impl<V: Clone> TtlStore<V> {
    // == Constructor ==
    /// Creates an empty store with the given default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
        }
    }

    /// Returns the TTL used when `set` receives none.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Get ==
    /// Retrieves a fresh value by key.
    ///
    /// A stale entry is removed and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = self.entries.get(key)?.is_expired();
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Set ==
    /// Stores a value, replacing any existing entry for the key.
    ///
    /// A missing or zero TTL falls back to the default.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let ttl = ttl.filter(|ttl| !ttl.is_zero()).unwrap_or(self.default_ttl);
        self.entries.insert(key.into(), CacheEntry::new(value, ttl));
    }

    // == Invalidate ==
    /// Removes a single entry. Returns whether one was present.
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Invalidate Matching ==
    /// Removes every entry whose key matches `pattern`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_matching(&mut self, pattern: &Regex) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !pattern.is_match(key));
        before - self.entries.len()
    }

    // == Clear ==
    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Stats ==
    /// Counts fresh and stale entries without evicting anything.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut stats = CacheStats::new();
        for entry in self.entries.values() {
            stats.record_entry(entry.is_expired_at(now));
        }
        stats
    }

    // == Contains ==
    /// Checks for a stored entry, fresh or not, without evicting it.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Length ==
    /// Returns the number of stored entries, including stale ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
