//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A stored read result together with its freshness metadata.
///
/// Entries are never mutated after creation; storing under the same key
/// replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cached result
    pub value: V,
    /// When the entry was stored
    pub stored_at: Instant,
    /// Lifetime of this entry
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry stored now with the given lifetime.
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
            ttl,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is stale only once strictly more than `ttl` has elapsed since
    /// it was stored; at exactly `ttl` it is still served.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Same as [`is_expired`](Self::is_expired) against an explicit instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > self.ttl
    }
}
