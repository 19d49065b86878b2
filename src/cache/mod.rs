//! Cache Module
//!
//! Read-through query cache with TTL expiry, pattern invalidation and
//! deduplication of concurrent identical reads.

mod accessor;
mod entry;
mod invalidation;
mod key;
mod query_cache;
mod stats;
mod store;


use std::time::Duration;

// Re-export public types
pub use accessor::{CacheOptions, CachedFn, KeyGenerator};
pub use entry::CacheEntry;
pub use invalidation::Invalidation;
pub use key::generate_cache_key;
pub use query_cache::QueryCache;
pub use stats::CacheStats;
pub use store::TtlStore;

// == Public Constants ==
/// Lifetime of entries stored without an explicit TTL
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
