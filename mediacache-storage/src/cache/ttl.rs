//! Time-bounded read-through store.
//!
//! Entries are keyed by media id under a namespace prefix and expire a fixed
//! time after they were stored. Whether the store is used at all is decided
//! once, at construction, from [`MediaCacheConfig`].
//!
//! Concurrent misses for the same key may both run their producer; the last
//! value stored wins. No map guard is held while a producer runs, so an
//! invalidation that lands while a producer is in flight can be undone by
//! that producer's insert.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use mediacache_core::{MediaCacheConfig, MediaId};
use tokio::time::Instant;

use super::traits::{CacheStats, CacheableValue};

/// Key prefix for media entries.
pub const MEDIA_CACHE_NAMESPACE: &str = "media-cache:";

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    stored_at: Instant,
}

impl<V> Slot<V> {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

/// Namespaced TTL cache over a concurrent map.
#[derive(Debug)]
pub struct TtlCache<V: CacheableValue> {
    namespace: String,
    ttl: Option<Duration>,
    entries: DashMap<String, Slot<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: CacheableValue> TtlCache<V> {
    /// Create a cache. `None` or a zero TTL disables it.
    pub fn new(namespace: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            namespace: namespace.into(),
            ttl: ttl.filter(|ttl| !ttl.is_zero()),
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Media cache with the configured TTL.
    pub fn from_config(config: &MediaCacheConfig) -> Self {
        Self::new(MEDIA_CACHE_NAMESPACE, config.cache_ttl)
    }

    /// Whether entries are stored at all.
    pub fn is_enabled(&self) -> bool {
        self.ttl.is_some()
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// The map key for a media id.
    pub fn key_for(&self, id: MediaId) -> String {
        format!("{}{}", self.namespace, id)
    }

    /// A fresh entry for `id`. An expired entry is dropped on the way.
    pub fn get(&self, id: MediaId) -> Option<V> {
        let ttl = self.ttl?;
        let key = self.key_for(id);
        let now = Instant::now();

        let lookup = self
            .entries
            .get(&key)
            .map(|slot| slot.is_fresh(ttl, now).then(|| slot.value.clone()));

        let found = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.entries.remove_if(&key, |_, slot| !slot.is_fresh(ttl, now));
                None
            }
            None => None,
        };

        match found {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a value, restarting its TTL window. No-op when disabled.
    pub fn insert(&self, id: MediaId, value: V) {
        if self.ttl.is_none() {
            return;
        }
        self.entries.insert(
            self.key_for(id),
            Slot {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Return the fresh entry for `id`, or run `producer` and store what it
    /// finds. `None` from the producer is returned but not stored, and errors
    /// pass through.
    pub async fn get_or_compute<F, Fut, E>(&self, id: MediaId, producer: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        if !self.is_enabled() {
            return producer().await;
        }
        if let Some(value) = self.get(id) {
            return Ok(Some(value));
        }

        let produced = producer().await?;
        if let Some(value) = &produced {
            self.insert(id, value.clone());
        }
        Ok(produced)
    }

    /// Remove the entry for `id`. Returns whether one was present.
    pub fn invalidate(&self, id: MediaId) -> bool {
        self.entries.remove(&self.key_for(id)).is_some()
    }

    /// Remove every entry whose value matches. Returns how many were removed.
    pub fn invalidate_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&V) -> bool,
    {
        let mut removed = 0;
        self.entries.retain(|_, slot| {
            let keep = !predicate(&slot.value);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Drop every entry of the namespace.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop entries past their TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, slot| {
            let keep = slot.is_fresh(ttl, now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
        }
    }
}
