//! Write-Path Invalidation Module
//!
//! Runs a write against the backend and, only once it succeeds, drops the
//! cache entries it made stale.

use std::future::Future;

use regex::Regex;
use tracing::info;

use crate::cache::query_cache::compile_pattern;
use crate::cache::QueryCache;
use crate::error::{CacheError, Result};

// == Invalidation ==
/// Keys and patterns a write makes stale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalidation {
    keys: Vec<String>,
    patterns: Vec<String>,
}

impl Invalidation {
    /// Empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exact key, typically the "get X by id" entry.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.keys.push(key.into());
        self
    }

    /// Adds a regular expression for broader listings that may include the record.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    fn compile(&self) -> Result<Vec<Regex>> {
        self.patterns.iter().map(|p| compile_pattern(p)).collect()
    }
}

impl QueryCache {
    // == After Write ==
    /// Awaits `write`, then applies `plan` if the write succeeded.
    ///
    /// Patterns are compiled before the write starts, so a bad pattern fails
    /// without touching the backend. A failed write invalidates nothing.
    pub async fn after_write<T, E, Fut>(
        &self,
        write: Fut,
        plan: &Invalidation,
    ) -> std::result::Result<T, E>
    where
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<CacheError>,
    {
        let patterns = plan.compile()?;

        let written = write.await?;

        let mut removed = 0;
        for key in &plan.keys {
            if self.invalidate(key) {
                removed += 1;
            }
        }
        for pattern in &patterns {
            removed += self.invalidate_regex(pattern);
        }
        info!(
            keys = plan.keys.len(),
            patterns = patterns.len(),
            removed,
            "write succeeded, cache invalidated"
        );

        Ok(written)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn seeded_cache() -> QueryCache {
        let cache = QueryCache::default();
        cache.set("getUserProfile:userId:\"u1\"", "old".to_string(), None);
        cache.set("listUserProfiles", vec!["old".to_string()], None);
        cache.set("getCourse:courseId:\"c1\"", "course".to_string(), None);
        cache
    }

    fn plan() -> Invalidation {
        Invalidation::new()
            .key("getUserProfile:userId:\"u1\"")
            .pattern("^listUserProfiles")
    }

    #[tokio::test]
    async fn test_successful_write_invalidates() {
        let cache = seeded_cache();

        let result = cache
            .after_write(async { Ok::<_, ServiceError>("new") }, &plan())
            .await;

        assert_eq!(result, Ok("new"));
        assert_eq!(cache.get::<String>("getUserProfile:userId:\"u1\""), None);
        assert_eq!(cache.get::<Vec<String>>("listUserProfiles"), None);
        assert_eq!(
            cache.get::<String>("getCourse:courseId:\"c1\""),
            Some("course".to_string())
        );
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cache() {
        let cache = seeded_cache();

        let result = cache
            .after_write(
                async { Err::<(), _>(ServiceError::Backend("write rejected".into())) },
                &plan(),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(
            cache.get::<String>("getUserProfile:userId:\"u1\""),
            Some("old".to_string())
        );
        assert_eq!(cache.stats().total, 3);
    }

    #[tokio::test]
    async fn test_invalid_pattern_skips_write() {
        let cache = seeded_cache();
        let wrote = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&wrote);

        let result = cache
            .after_write(
                async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok::<_, ServiceError>(())
                },
                &Invalidation::new().pattern("[broken"),
            )
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::Cache(CacheError::InvalidPattern { .. }))
        ));
        assert!(!wrote.load(Ordering::SeqCst));
        assert_eq!(cache.stats().total, 3);
    }

    #[tokio::test]
    async fn test_absent_keys_are_not_an_error() {
        let cache = QueryCache::default();

        let result = cache
            .after_write(async { Ok::<_, ServiceError>(1) }, &plan())
            .await;

        assert_eq!(result, Ok(1));
    }

    #[test]
    fn test_plan_builder() {
        assert_eq!(
            plan(),
            Invalidation {
                keys: vec!["getUserProfile:userId:\"u1\"".to_string()],
                patterns: vec!["^listUserProfiles".to_string()],
            }
        );
        assert_eq!(Invalidation::new(), Invalidation::default());
    }
}
