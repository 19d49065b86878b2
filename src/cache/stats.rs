//! Cache Statistics Module
//!
//! Point-in-time snapshot of how many stored entries are still fresh.

use serde::Serialize;

// == Cache Stats ==
/// Diagnostic snapshot of the TTL store.
///
/// `expired` counts entries whose TTL has elapsed but which no `get` has
/// evicted yet. With lazy eviction this can stay non-zero indefinitely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of stored entries, fresh or not
    pub total: usize,
    /// Entries still within their TTL
    pub valid: usize,
    /// Entries past their TTL awaiting lazy eviction
    pub expired: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Entry ==
    /// Counts one stored entry.
    pub fn record_entry(&mut self, expired: bool) {
        self.total += 1;
        if expired {
            self.expired += 1;
        } else {
            self.valid += 1;
        }
    }

    // == Expired Ratio ==
    /// Share of stored entries that are stale, or 0.0 for an empty store.
    pub fn expired_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.expired as f64 / self.total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.valid, 0);
        assert_eq!(stats.expired, 0);
    }

    #[test]
    fn test_record_entry() {
        let mut stats = CacheStats::new();
        stats.record_entry(false);
        stats.record_entry(false);
        stats.record_entry(true);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.valid, 2);
        assert_eq!(stats.expired, 1);
    }

    #[test]
    fn test_expired_ratio() {
        let mut stats = CacheStats::new();
        assert_eq!(stats.expired_ratio(), 0.0);

        stats.record_entry(true);
        stats.record_entry(false);
        assert_eq!(stats.expired_ratio(), 0.5);
    }

    #[test]
    fn test_stats_serialize() {
        let mut stats = CacheStats::new();
        stats.record_entry(false);

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["valid"], 1);
        assert_eq!(json["expired"], 0);
    }
}
