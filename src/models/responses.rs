//! Response DTOs for the HTTP API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Stored entries, fresh or not
    pub total: usize,
    /// Entries within their TTL
    pub valid: usize,
    /// Entries past their TTL not yet evicted
    pub expired: usize,
    /// Share of stored entries past their TTL
    pub expired_ratio: f64,
    /// Reads currently in flight
    pub pending: usize,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a store snapshot
    pub fn new(stats: CacheStats, pending: usize) -> Self {
        Self {
            total: stats.total,
            valid: stats.valid,
            expired: stats.expired,
            expired_ratio: stats.expired_ratio(),
            pending,
        }
    }
}

/// Response body for single-key invalidation (DELETE /cache/:key)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// The key that was invalidated
    pub key: String,
    /// Whether an entry was present
    pub removed: bool,
}

impl InvalidateResponse {
    pub fn new(key: impl Into<String>, removed: bool) -> Self {
        Self {
            key: key.into(),
            removed,
        }
    }
}

/// Response body for pattern invalidation (POST /cache/invalidate)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidatePatternResponse {
    /// The pattern that was applied
    pub pattern: String,
    /// Number of entries removed
    pub removed: usize,
}

impl InvalidatePatternResponse {
    pub fn new(pattern: impl Into<String>, removed: usize) -> Self {
        Self {
            pattern: pattern.into(),
            removed,
        }
    }
}

/// Response body for clearing the cache (DELETE /cache)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// Number of entries dropped
    pub removed: usize,
}

impl ClearResponse {
    pub fn new(removed: usize) -> Self {
        Self {
            message: "Cache cleared".to_string(),
            removed,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
