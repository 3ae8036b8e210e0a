//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;

use crate::cache::CacheOptions;
use crate::keys::{normalize_ttl, Ttl, DEFAULT_TTL_MS};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Capacity of the in-memory cache adapter
    pub max_entries: usize,
    /// Lifetime of cached reads that do not set their own TTL, in milliseconds
    pub default_ttl_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `DEFAULT_TTL` - TTL such as `90s`, `5m` or `1500` (default: 60000 ms)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: parsed_var("CACHE_MAX_ENTRIES").unwrap_or(defaults.max_entries),
            default_ttl_ms: env::var("DEFAULT_TTL")
                .map(|raw| normalize_ttl(Some(&Ttl::from(raw.trim()))))
                .unwrap_or(defaults.default_ttl_ms),
            server_port: parsed_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parsed_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Caching enabled with the configured default TTL.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions::new().with_ttl(self.default_ttl_ms)
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl_ms: DEFAULT_TTL_MS,
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}
