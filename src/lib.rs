//! Query Cache - read-through cache for profile and content lookups
//!
//! Provides TTL expiry, pattern-based invalidation and deduplication of
//! concurrent identical reads in front of an async backing store.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod profiles;

pub use api::AppState;
pub use cache::{generate_cache_key, CacheOptions, Invalidation, QueryCache};
pub use config::Config;
