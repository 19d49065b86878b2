//! Query Cache Module
//!
//! Shared handle over the TTL store and the map of reads currently in flight.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use regex::Regex;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, TtlStore};
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Type-erased stored value or settled read outcome.
pub(crate) type Erased = Arc<dyn Any + Send + Sync>;

/// Handle every waiter on the same key awaits.
pub(crate) type SharedRead = Shared<BoxFuture<'static, Settled>>;

// == Settled ==
/// Final state of an in-flight read as seen by its waiters.
#[derive(Clone)]
pub(crate) enum Settled {
    /// The read returned; holds its `Result<T, E>`
    Done(Erased),
    /// The read panicked
    Panicked(String),
    /// The read task was cancelled, e.g. by runtime shutdown
    Aborted,
}

impl Settled {
    fn from_join(joined: std::result::Result<Erased, JoinError>) -> Self {
        match joined {
            Ok(outcome) => Settled::Done(outcome),
            Err(err) if err.is_panic() => {
                let payload = err.into_panic();
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                Settled::Panicked(message)
            }
            Err(_) => Settled::Aborted,
        }
    }
}

// == In Flight ==
struct InFlight {
    read: SharedRead,
    /// Set when an invalidation hit the key while the read was running
    stale: bool,
}

// == Lookup ==
/// Outcome of the locked check-then-register step.
pub(crate) enum Lookup<T> {
    /// Fresh value from the store
    Hit(T),
    /// Read to await; `started` is false when attaching to an existing one
    InFlight { read: SharedRead, started: bool },
}

struct Inner {
    /// Lock order: `pending` before `store`
    pending: Mutex<HashMap<String, InFlight>>,
    store: Mutex<TtlStore<Erased>>,
}

impl Inner {
    fn invalidate_regex(&self, pattern: &Regex) -> usize {
        let mut pending = self.pending.lock();
        for (key, in_flight) in pending.iter_mut() {
            if pattern.is_match(key) {
                in_flight.stale = true;
            }
        }
        self.store.lock().invalidate_matching(pattern)
    }
}

// == Query Cache ==
/// Process-local read cache shared by every caller that holds a clone.
///
/// Cloning is cheap: all clones share the same store and in-flight map.
/// Build one per process (or per test) and pass it to whatever needs it.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("stats", &self.stats())
            .field("pending", &self.pending_requests())
            .finish()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(crate::cache::DEFAULT_TTL)
    }
}

impl QueryCache {
    // == Constructor ==
    /// Creates an empty cache whose entries live `default_ttl` unless told otherwise.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(HashMap::new()),
                store: Mutex::new(TtlStore::new(default_ttl)),
            }),
        }
    }

    /// Creates a cache using the configured default TTL.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_ttl())
    }

    /// Returns the TTL applied when none is given.
    pub fn default_ttl(&self) -> Duration {
        self.inner.store.lock().default_ttl()
    }

    // == Get ==
    /// Returns the fresh value stored under `key`.
    ///
    /// A value stored with a different type reads as absent.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + 'static,
    {
        let stored = self.inner.store.lock().get(key)?;
        let value = stored.downcast_ref::<T>().cloned();
        if value.is_none() {
            warn!(key, "cached value has an unexpected type");
        }
        value
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any existing entry.
    pub fn set<T>(&self, key: impl Into<String>, value: T, ttl: Option<Duration>)
    where
        T: Send + Sync + 'static,
    {
        self.inner.store.lock().set(key, Arc::new(value), ttl);
    }

    // == Invalidate ==
    /// Removes the entry for `key`. Returns whether one was stored.
    ///
    /// A read already in flight for `key` still answers its waiters but its
    /// result is not stored.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut pending = self.inner.pending.lock();
        if let Some(in_flight) = pending.get_mut(key) {
            in_flight.stale = true;
        }
        let removed = self.inner.store.lock().invalidate(key);
        debug!(key, removed, "invalidated key");
        removed
    }

    // == Invalidate Pattern ==
    /// Removes every entry whose key matches the regular expression `pattern`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        let regex = compile_pattern(pattern)?;
        let removed = self.inner.invalidate_regex(&regex);
        info!(pattern, removed, "invalidated pattern");
        Ok(removed)
    }

    pub(crate) fn invalidate_regex(&self, pattern: &Regex) -> usize {
        self.inner.invalidate_regex(pattern)
    }

    // == Clear ==
    /// Removes all entries and keeps in-flight reads from storing their results.
    pub fn clear(&self) {
        let mut pending = self.inner.pending.lock();
        for in_flight in pending.values_mut() {
            in_flight.stale = true;
        }
        self.inner.store.lock().clear();
        info!("cache cleared");
    }

    // == Stats ==
    /// Snapshot of stored entries.
    pub fn stats(&self) -> CacheStats {
        self.inner.store.lock().stats()
    }

    /// Number of reads currently in flight.
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.lock().len()
    }

    // == Lookup Or Start ==
    /// Answers from the store, attaches to a running read, or starts one.
    ///
    /// Runs entirely under the pending-map lock so two callers can never both
    /// start a read for the same key. `start` is only invoked inside the
    /// spawned task, after the lock is released.
    pub(crate) fn lookup_or_start<T, E, Fut>(
        &self,
        key: &str,
        start: impl FnOnce() -> Fut + Send + 'static,
        ttl: Option<Duration>,
        invalidate_on: Arc<[Regex]>,
    ) -> Lookup<T>
    where
        T: Clone + Send + Sync + 'static,
        E: Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        let mut pending = self.inner.pending.lock();

        if let Some(stored) = self.inner.store.lock().get(key) {
            match stored.downcast_ref::<T>() {
                Some(value) => {
                    debug!(key, "cache hit");
                    return Lookup::Hit(value.clone());
                }
                None => warn!(key, "cached value has an unexpected type, reading again"),
            }
        }

        if let Some(in_flight) = pending.get(key) {
            debug!(key, "attaching to in-flight read");
            return Lookup::InFlight {
                read: in_flight.read.clone(),
                started: false,
            };
        }

        debug!(key, "cache miss, starting read");
        let slot = PendingSlot {
            inner: Arc::clone(&self.inner),
            key: key.to_string(),
            settled: false,
        };
        let inner = Arc::clone(&self.inner);
        let owned_key = key.to_string();
        let task = tokio::spawn(async move {
            let result = start().await;
            match &result {
                Ok(value) => {
                    if !slot.settle(Some((Arc::new(value.clone()) as Erased, ttl))) {
                        debug!(key = %owned_key, "read settled after invalidation, result not stored");
                    }
                    for pattern in invalidate_on.iter() {
                        let removed = inner.invalidate_regex(pattern);
                        debug!(key = %owned_key, pattern = %pattern, removed, "post-read invalidation");
                    }
                }
                Err(_) => {
                    slot.settle(None);
                    warn!(key = %owned_key, "read failed, result not cached");
                }
            }
            Arc::new(result) as Erased
        });
        let read = task.map(Settled::from_join).boxed().shared();

        pending.insert(
            key.to_string(),
            InFlight {
                read: read.clone(),
                stale: false,
            },
        );

        Lookup::InFlight {
            read,
            started: true,
        }
    }
}

/// Compiles an invalidation pattern.
pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|err| CacheError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })
}

// == Pending Slot ==
/// Owns the in-flight registration of one read and removes it exactly once,
/// including when the read panics.
struct PendingSlot {
    inner: Arc<Inner>,
    key: String,
    settled: bool,
}

impl PendingSlot {
    /// Unregisters the read and stores `value` unless the key was invalidated
    /// meanwhile. Returns whether the value was stored.
    fn settle(mut self, value: Option<(Erased, Option<Duration>)>) -> bool {
        self.settled = true;
        let mut pending = self.inner.pending.lock();
        let stale = pending.remove(&self.key).map_or(true, |in_flight| in_flight.stale);
        match value {
            Some((value, ttl)) if !stale => {
                self.inner.store.lock().set(self.key.clone(), value, ttl);
                true
            }
            _ => false,
        }
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        if !self.settled {
            self.inner.pending.lock().remove(&self.key);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_with_types() {
        let cache = QueryCache::default();

        cache.set("count", 3u32, None);
        cache.set("names", vec!["a".to_string()], None);

        assert_eq!(cache.get::<u32>("count"), Some(3));
        assert_eq!(cache.get::<Vec<String>>("names"), Some(vec!["a".to_string()]));
        assert_eq!(cache.get::<String>("count"), None, "wrong type reads as absent");
        assert_eq!(cache.get::<u32>("missing"), None);
    }

    #[test]
    fn test_clones_share_state() {
        let cache = QueryCache::new(Duration::from_secs(10));
        let other = cache.clone();

        cache.set("k", 1u8, None);

        assert_eq!(other.get::<u8>("k"), Some(1));
        assert_eq!(other.default_ttl(), Duration::from_secs(10));
    }

    #[test]
    fn test_invalidate_and_pattern() {
        let cache = QueryCache::default();
        cache.set("user:1", 1u8, None);
        cache.set("user:2", 2u8, None);
        cache.set("order:1", 3u8, None);

        assert!(cache.invalidate("order:1"));
        assert!(!cache.invalidate("order:1"));
        assert_eq!(cache.invalidate_pattern("^user:").unwrap(), 2);
        assert_eq!(cache.stats().total, 0);
    }

    #[test]
    fn test_invalid_pattern() {
        let cache = QueryCache::default();
        cache.set("user:1", 1u8, None);

        let result = cache.invalidate_pattern("user:(");

        assert!(matches!(result, Err(CacheError::InvalidPattern { .. })));
        assert_eq!(cache.stats().total, 1);
    }

    #[test]
    fn test_clear() {
        let cache = QueryCache::default();
        cache.set("a", 1u8, None);
        cache.set("b", 2u8, None);

        cache.clear();

        assert_eq!(cache.stats(), CacheStats::default());
        assert_eq!(cache.pending_requests(), 0);
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            default_ttl: 42,
            ..Config::default()
        };
        assert_eq!(QueryCache::from_config(&config).default_ttl(), Duration::from_secs(42));
    }
}
