//! Cache-Aware Accessor Module
//!
//! Turns an async read function into a cached, deduplicated drop-in replacement.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::cache::query_cache::{compile_pattern, Lookup, Settled};
use crate::cache::{generate_cache_key, QueryCache};
use crate::error::{CacheError, Result};

/// Custom key builder for a wrapped read.
pub type KeyGenerator<P> = Arc<dyn Fn(&P) -> Result<String> + Send + Sync>;

// == Cache Options ==
/// Per-function caching options.
pub struct CacheOptions<P> {
    ttl: Option<Duration>,
    key_generator: Option<KeyGenerator<P>>,
    invalidate_on: Vec<String>,
}

impl<P> Default for CacheOptions<P> {
    fn default() -> Self {
        Self {
            ttl: None,
            key_generator: None,
            invalidate_on: Vec::new(),
        }
    }
}

impl<P> fmt::Debug for CacheOptions<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("ttl", &self.ttl)
            .field("custom_key_generator", &self.key_generator.is_some())
            .field("invalidate_on", &self.invalidate_on)
            .finish()
    }
}

impl<P> CacheOptions<P> {
    /// Options with the cache's default TTL and the canonical key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifetime of results from this function. Zero means the cache default.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Replaces the canonical key with a custom one.
    pub fn key_generator<G>(mut self, generator: G) -> Self
    where
        G: Fn(&P) -> Result<String> + Send + Sync + 'static,
    {
        self.key_generator = Some(Arc::new(generator));
        self
    }

    /// Pattern to invalidate after every successful execution of the read.
    pub fn invalidate_on(mut self, pattern: impl Into<String>) -> Self {
        self.invalidate_on.push(pattern.into());
        self
    }
}

// == Cached Fn ==
/// A read function wrapped by [`QueryCache::wrap`].
///
/// `call` has the same shape as the wrapped function. Cloning shares the
/// function and the cache.
pub struct CachedFn<P, T, E, F> {
    cache: QueryCache,
    name: Arc<str>,
    ttl: Option<Duration>,
    key_generator: Option<KeyGenerator<P>>,
    invalidate_on: Arc<[Regex]>,
    read: Arc<F>,
    _marker: PhantomData<fn(P) -> std::result::Result<T, E>>,
}

// Manual Clone implementation that doesn't require P, T, E or F to be Clone
impl<P, T, E, F> Clone for CachedFn<P, T, E, F> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            name: Arc::clone(&self.name),
            ttl: self.ttl,
            key_generator: self.key_generator.clone(),
            invalidate_on: Arc::clone(&self.invalidate_on),
            read: Arc::clone(&self.read),
            _marker: PhantomData,
        }
    }
}

impl<P, T, E, F> fmt::Debug for CachedFn<P, T, E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedFn")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<P, T, E, F, Fut> CachedFn<P, T, E, F>
where
    P: Serialize + Send + 'static,
    T: Clone + Send + Sync + 'static,
    E: From<CacheError> + Clone + Send + Sync + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
{
    /// Function name used in generated keys.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cache key this wrapper uses for `params`.
    pub fn cache_key(&self, params: &P) -> Result<String> {
        match &self.key_generator {
            Some(generator) => generator(params),
            None => generate_cache_key(&self.name, params),
        }
    }

    // == Call ==
    /// Serves `params` from the cache, joins an identical read in flight, or
    /// runs the wrapped function.
    ///
    /// Failures of the wrapped function reach every waiter unchanged and are
    /// never cached.
    pub async fn call(&self, params: P) -> std::result::Result<T, E> {
        let key = self.cache_key(&params)?;
        let read = Arc::clone(&self.read);

        let read = match self.cache.lookup_or_start::<T, E, Fut>(
            &key,
            move || read(params),
            self.ttl,
            Arc::clone(&self.invalidate_on),
        ) {
            Lookup::Hit(value) => return Ok(value),
            Lookup::InFlight { read, started } => {
                debug!(key = %key, started, function = %self.name, "awaiting read");
                read
            }
        };

        match read.await {
            Settled::Done(outcome) => outcome
                .downcast_ref::<std::result::Result<T, E>>()
                .cloned()
                .unwrap_or_else(|| Err(CacheError::TypeMismatch(key).into())),
            Settled::Panicked(message) => panic!("cached read for '{}' panicked: {}", key, message),
            Settled::Aborted => Err(CacheError::ReadAborted(key).into()),
        }
    }
}

impl QueryCache {
    // == Wrap ==
    /// Wraps `read` so calls go through this cache.
    ///
    /// `name` is the function name used in canonical keys. Fails if one of
    /// the `invalidate_on` patterns does not compile.
    pub fn wrap<P, T, E, F, Fut>(
        &self,
        name: impl Into<Arc<str>>,
        read: F,
        options: CacheOptions<P>,
    ) -> Result<CachedFn<P, T, E, F>>
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        let invalidate_on = options
            .invalidate_on
            .iter()
            .map(|pattern| compile_pattern(pattern))
            .collect::<Result<Vec<_>>>()?;

        Ok(CachedFn {
            cache: self.clone(),
            name: name.into(),
            ttl: options.ttl,
            key_generator: options.key_generator,
            invalidate_on: invalidate_on.into(),
            read: Arc::new(read),
            _marker: PhantomData,
        })
    }
}
