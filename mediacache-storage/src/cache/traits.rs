//! Cacheable value marker and cache statistics.

use mediacache_core::CacheValues;

/// Marker trait for values the media cache can hold.
///
/// The invalidator matches descendants by stored path, so the path must be
/// readable from the value.
pub trait CacheableValue: Clone + Send + Sync + 'static {
    /// Slash-delimited ancestor chain, empty when unknown.
    fn stored_path(&self) -> &str;
}

impl CacheableValue for CacheValues {
    fn stored_path(&self) -> &str {
        self.values().stored_path()
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a fresh entry.
    pub hits: u64,
    /// Lookups that found nothing or an expired entry.
    pub misses: u64,
    /// Entries currently stored, expired ones included until purged.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
