//! Canonical value maps and the cache entries that hold them

use crate::identity::{fields, MediaId};
use crate::legacy::LegacyNode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// CANONICAL VALUE MAP
// ============================================================================

/// Insertion-ordered map from attribute name to attribute value.
///
/// One map describes exactly one media node: identity, position in the
/// hierarchy, audit fields and user-defined properties, all flattened to
/// strings. Maps are small, so lookups scan the entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalValueMap {
    entries: Vec<(String, String)>,
}

impl CanonicalValueMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get a value by exact key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get a value by key, ignoring ASCII case.
    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Get the value of the first key in `keys` that is present.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    /// Whether the map holds `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or overwrite a value, keeping the original position of an
    /// existing key. Returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Insert only when `key` is absent (first writer wins).
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if self.contains_key(&key) {
            return false;
        }
        self.entries.push((key, value.into()));
        true
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// The `id` value parsed as a media id.
    pub fn id(&self) -> Option<MediaId> {
        self.get(fields::ID).and_then(|v| v.trim().parse().ok())
    }

    /// The stored ancestor path, read from `path` and then from the index
    /// path field. Empty when neither is present.
    pub fn stored_path(&self) -> &str {
        self.first_of(&[fields::PATH, fields::INDEX_PATH]).unwrap_or("")
    }

    /// Required keys that are not present.
    pub fn missing_required(&self) -> Vec<&'static str> {
        fields::REQUIRED
            .iter()
            .copied()
            .filter(|key| !self.contains_key(key))
            .collect()
    }

    /// Fill in any required key that is still missing.
    ///
    /// A missing `key` becomes the nil uuid, a missing `path` is taken from
    /// the index path field when available, everything else becomes empty.
    pub fn backfill_required(&mut self) {
        for key in self.missing_required() {
            let value = match key {
                fields::KEY => Uuid::nil().to_string(),
                fields::PATH => self.get(fields::INDEX_PATH).unwrap_or("").to_string(),
                _ => String::new(),
            };
            self.entries.push((key.to_string(), value));
        }
    }
}

impl FromIterator<(String, String)> for CanonicalValueMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = CanonicalValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for CanonicalValueMap {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

// ============================================================================
// CACHE VALUES
// ============================================================================

/// Which backend a value map was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueOrigin {
    /// A search-index result row.
    SearchIndex,
    /// A node of the legacy media tree.
    LegacyTree,
    /// An entity loaded from the media repository.
    Repository,
}

/// A resolved media node as held by the cache.
///
/// The legacy node handle is only kept when the configuration asks for it;
/// steady-state entries never pin a tree.
#[derive(Debug, Clone)]
pub struct CacheValues {
    values: Arc<CanonicalValueMap>,
    legacy_node: Option<Arc<LegacyNode>>,
    origin: ValueOrigin,
}

impl CacheValues {
    /// Wrap a value map with its origin.
    pub fn new(values: CanonicalValueMap, origin: ValueOrigin) -> Self {
        Self {
            values: Arc::new(values),
            legacy_node: None,
            origin,
        }
    }

    /// Attach the legacy node the values were read from.
    pub fn with_legacy_node(mut self, node: Arc<LegacyNode>) -> Self {
        self.legacy_node = Some(node);
        self
    }

    /// The canonical values.
    pub fn values(&self) -> &CanonicalValueMap {
        &self.values
    }

    /// The retained legacy node, if any.
    pub fn legacy_node(&self) -> Option<&LegacyNode> {
        self.legacy_node.as_deref()
    }

    /// Where the values came from.
    pub fn origin(&self) -> ValueOrigin {
        self.origin
    }

    /// Whether the values came from the search index.
    pub fn is_search_indexed(&self) -> bool {
        self.origin == ValueOrigin::SearchIndex
    }

    /// The media id of the values.
    pub fn id(&self) -> Option<MediaId> {
        self.values.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut map = CanonicalValueMap::new();
        map.insert("a", "1");
        map.insert("b", "2");
        assert_eq!(map.insert("a", "3"), Some("1".to_string()));
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(map.get("a"), Some("3"));
    }

    #[test]
    fn test_insert_if_absent_keeps_first_writer() {
        let mut map = CanonicalValueMap::new();
        assert!(map.insert_if_absent("nodeTypeAlias", "Image"));
        assert!(!map.insert_if_absent("nodeTypeAlias", "File"));
        assert_eq!(map.get("nodeTypeAlias"), Some("Image"));
    }

    #[test]
    fn test_get_ignore_case() {
        let map: CanonicalValueMap = [("umbracoFile", "/media/a.png")].into_iter().collect();
        assert_eq!(map.get("umbracofile"), None);
        assert_eq!(map.get_ignore_case("UMBRACOFILE"), Some("/media/a.png"));
    }

    #[test]
    fn test_stored_path_falls_back_to_index_field() {
        let map: CanonicalValueMap = [("__Path", "/-1/5/")].into_iter().collect();
        assert_eq!(map.stored_path(), "/-1/5/");

        let map: CanonicalValueMap = [("path", "/-1/7/"), ("__Path", "/-1/5/")]
            .into_iter()
            .collect();
        assert_eq!(map.stored_path(), "/-1/7/");

        assert_eq!(CanonicalValueMap::new().stored_path(), "");
    }

    #[test]
    fn test_backfill_required() {
        let mut map: CanonicalValueMap = [("id", "12"), ("__Path", "/-1/12/")]
            .into_iter()
            .collect();
        map.backfill_required();
        assert!(map.missing_required().is_empty());
        assert_eq!(map.get("key"), Some("00000000-0000-0000-0000-000000000000"));
        assert_eq!(map.get("path"), Some("/-1/12/"));
        assert_eq!(map.get("level"), Some(""));
        assert_eq!(map.id(), Some(12));
    }

    #[test]
    fn test_cache_values_origin() {
        let values = CacheValues::new(CanonicalValueMap::new(), ValueOrigin::SearchIndex);
        assert!(values.is_search_indexed());
        assert!(values.legacy_node().is_none());

        let values = CacheValues::new(CanonicalValueMap::new(), ValueOrigin::Repository);
        assert!(!values.is_search_indexed());
    }
}
