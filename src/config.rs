//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default TTL in seconds for cache entries without explicit TTL
    pub default_ttl: u64,
    /// TTL in seconds for cached profile reads
    pub profile_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Simulated latency of the in-memory backend in milliseconds
    pub backend_latency_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Default cache TTL in seconds (default: 300)
    /// - `PROFILE_TTL` - Profile read TTL in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `BACKEND_LATENCY_MS` - Simulated backend latency (default: 0)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            profile_ttl: env_or("PROFILE_TTL", defaults.profile_ttl),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            backend_latency_ms: env_or("BACKEND_LATENCY_MS", defaults.backend_latency_ms),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    pub fn profile_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_ttl)
    }

    pub fn backend_latency(&self) -> Duration {
        Duration::from_millis(self.backend_latency_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: 300,
            profile_ttl: 300,
            server_port: 3000,
            backend_latency_ms: 0,
        }
    }
}

/// Reads and parses an environment variable, falling back on absence or parse failure.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.profile_ttl, 300);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.backend_latency_ms, 0);
        assert_eq!(config.default_ttl(), crate::cache::DEFAULT_TTL);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("DEFAULT_TTL");
        env::remove_var("PROFILE_TTL");
        env::remove_var("SERVER_PORT");
        env::remove_var("BACKEND_LATENCY_MS");

        let config = Config::from_env();
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.profile_ttl, 300);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.backend_latency_ms, 0);
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        env::set_var("QUERY_CACHE_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_or("QUERY_CACHE_TEST_GARBAGE", 7u64), 7);
        env::remove_var("QUERY_CACHE_TEST_GARBAGE");
    }
}
