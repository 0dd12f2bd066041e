//! Configuration Module
//!
//! Handles loading server configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Maximum number of entries the in-process cache can hold
    pub max_entries: usize,
    /// TTL in seconds of cached records, counters and id lists
    pub record_ttl: u64,
    /// TTL in seconds of duplicate-submission tokens
    pub dedup_ttl: u64,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Fetches allowed in flight per list request
    pub aggregate_concurrency: usize,
    /// Redis connection string; the in-process cache is used when unset
    pub redis_url: Option<String>,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 10000)
    /// - `RECORD_TTL` - Cached record TTL in seconds (default: 3600)
    /// - `DEDUP_TTL` - Dedup token TTL in seconds (default: 300)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 30)
    /// - `AGGREGATE_CONCURRENCY` - Parallel fetches per page (default: 16)
    /// - `REDIS_URL` - Redis server, e.g. `redis://127.0.0.1:6379` (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            record_ttl: env_or("RECORD_TTL", defaults.record_ttl),
            dedup_ttl: env_or("DEDUP_TTL", defaults.dedup_ttl),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            aggregate_concurrency: env_or("AGGREGATE_CONCURRENCY", defaults.aggregate_concurrency),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            max_entries: 10_000,
            record_ttl: 3600,
            dedup_ttl: 300,
            cleanup_interval: 30,
            aggregate_concurrency: 16,
            redis_url: None,
        }
    }
}
