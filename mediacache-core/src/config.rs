//! Media cache configuration
//!
//! Configuration is read once, when the cache is constructed, and is never
//! reloaded. Values come from environment variables with defaults that keep
//! the cache off unless a lifetime is configured.

use crate::error::{ConfigError, MediaCacheError, MediaResult};
use std::time::Duration;

/// Environment variable holding the cache lifetime in seconds.
pub const CACHE_SECONDS_VAR: &str = "MEDIACACHE_CACHE_SECONDS";
/// Environment variable holding the index-miss warning threshold.
pub const INDEX_MISS_THRESHOLD_VAR: &str = "MEDIACACHE_INDEX_MISS_THRESHOLD";
/// Environment variable enabling retention of legacy nodes in cache entries.
pub const RETAIN_LEGACY_NODES_VAR: &str = "MEDIACACHE_RETAIN_LEGACY_NODES";

/// Default number of index misses before the corruption warning.
pub const DEFAULT_INDEX_MISS_THRESHOLD: u32 = 10;

/// Configuration for media resolution and caching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCacheConfig {
    /// Lifetime of a cache entry. `None` disables caching.
    pub cache_ttl: Option<Duration>,

    /// Index misses resolved from the repository before the one-time
    /// corruption warning is logged.
    pub index_miss_threshold: u32,

    /// Keep the raw legacy node in cache entries. Diagnostic and test
    /// configurations only.
    pub retain_legacy_nodes: bool,
}

impl Default for MediaCacheConfig {
    fn default() -> Self {
        Self {
            cache_ttl: None,
            index_miss_threshold: DEFAULT_INDEX_MISS_THRESHOLD,
            retain_legacy_nodes: false,
        }
    }
}

impl MediaCacheConfig {
    /// Create a config with caching disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create MediaCacheConfig from environment variables.
    ///
    /// Environment variables:
    /// - `MEDIACACHE_CACHE_SECONDS`: cache lifetime; absent, unparseable or
    ///   non-positive disables caching
    /// - `MEDIACACHE_INDEX_MISS_THRESHOLD`: positive integer (default: 10)
    /// - `MEDIACACHE_RETAIN_LEGACY_NODES`: "true" or "false" (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same parsing as [`from_env`](Self::from_env), against any source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_ttl = lookup(CACHE_SECONDS_VAR)
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::from_secs(secs as u64));

        let index_miss_threshold = lookup(INDEX_MISS_THRESHOLD_VAR)
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_INDEX_MISS_THRESHOLD);

        let retain_legacy_nodes = lookup(RETAIN_LEGACY_NODES_VAR)
            .map(|s| s.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            cache_ttl,
            index_miss_threshold,
            retain_legacy_nodes,
        }
    }

    /// Set the cache lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Disable caching.
    pub fn with_cache_disabled(mut self) -> Self {
        self.cache_ttl = None;
        self
    }

    /// Set the index-miss warning threshold.
    pub fn with_miss_threshold(mut self, threshold: u32) -> Self {
        self.index_miss_threshold = threshold;
        self
    }

    /// Keep legacy nodes in cache entries.
    pub fn with_retained_legacy_nodes(mut self, retain: bool) -> Self {
        self.retain_legacy_nodes = retain;
        self
    }

    /// Whether caching is enabled.
    pub fn cache_enabled(&self) -> bool {
        self.cache_ttl.is_some()
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - index_miss_threshold > 0
    /// - cache_ttl, when set, is not zero
    pub fn validate(&self) -> MediaResult<()> {
        if self.index_miss_threshold == 0 {
            return Err(MediaCacheError::Config(ConfigError::InvalidValue {
                field: "index_miss_threshold".to_string(),
                value: self.index_miss_threshold.to_string(),
                reason: "index_miss_threshold must be greater than 0".to_string(),
            }));
        }

        if self.cache_ttl == Some(Duration::ZERO) {
            return Err(MediaCacheError::Config(ConfigError::InvalidValue {
                field: "cache_ttl".to_string(),
                value: "0s".to_string(),
                reason: "use with_cache_disabled to turn caching off".to_string(),
            }));
        }

        Ok(())
    }
}
