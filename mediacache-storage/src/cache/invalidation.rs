//! Change-driven invalidation.
//!
//! A change to one media item can move or rename its whole subtree, so the
//! changed entry and every cached descendant are dropped. Descendants are
//! found by their stored path, which lists every ancestor id. The parent of
//! the changed item is left alone.

use std::sync::Arc;

use mediacache_core::{path_segment, MediaId};

use super::traits::CacheableValue;
use super::ttl::TtlCache;

/// What one invalidation removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    /// Whether the changed item itself was cached.
    pub direct: bool,
    /// Number of cached descendants removed.
    pub descendants: usize,
}

impl InvalidationReport {
    pub fn total(&self) -> usize {
        self.descendants + usize::from(self.direct)
    }
}

/// Drops cache entries in response to change notifications.
#[derive(Debug)]
pub struct MediaInvalidator<V: CacheableValue> {
    cache: Arc<TtlCache<V>>,
}

impl<V: CacheableValue> Clone for MediaInvalidator<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<V: CacheableValue> MediaInvalidator<V> {
    pub fn new(cache: Arc<TtlCache<V>>) -> Self {
        Self { cache }
    }

    /// Remove `id` and every entry whose path contains `/id/`.
    pub fn on_changed(&self, id: MediaId) -> InvalidationReport {
        let direct = self.cache.invalidate(id);
        let segment = path_segment(id);
        let descendants = self
            .cache
            .invalidate_where(|value| value.stored_path().contains(segment.as_str()));

        InvalidationReport {
            direct,
            descendants,
        }
    }
}
