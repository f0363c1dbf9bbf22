//! Entities exchanged with the media repository and the search index

use crate::identity::{fields, MediaId, MediaKey, Timestamp, UserId};
use crate::values::CanonicalValueMap;
use serde::{Deserialize, Serialize};

/// Media type of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaType {
    pub id: i32,
    pub alias: String,
}

/// A user-defined property value of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProperty {
    pub alias: String,
    pub value: Option<serde_json::Value>,
}

impl UserProperty {
    pub fn new(alias: impl Into<String>, value: Option<serde_json::Value>) -> Self {
        Self {
            alias: alias.into(),
            value,
        }
    }

    /// Convenience constructor for a text property.
    pub fn text(alias: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(alias, Some(serde_json::Value::String(value.into())))
    }

    /// The value as a string. Null values have no string form.
    pub fn value_string(&self) -> Option<String> {
        match &self.value {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

/// Media entity as held by the persistent store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntity {
    pub id: MediaId,
    pub key: MediaKey,
    pub parent_id: MediaId,
    pub level: i32,
    pub creator_id: UserId,
    pub sort_order: i32,
    pub create_date: Timestamp,
    pub update_date: Timestamp,
    pub name: String,
    /// Slash-delimited ancestor chain ending with the entity's own id.
    pub path: String,
    pub media_type: MediaType,
    pub trashed: bool,
    pub properties: Vec<UserProperty>,
}

/// One row returned by the search index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultRow {
    pub fields: CanonicalValueMap,
}

impl SearchResultRow {
    pub fn new(fields: CanonicalValueMap) -> Self {
        Self { fields }
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field)
    }

    /// The node id, read from the current and then the legacy id field.
    pub fn node_id(&self) -> Option<MediaId> {
        [fields::INDEX_NODE_ID, fields::LEGACY_NODE_ID]
            .iter()
            .find_map(|field| self.fields.get(field).and_then(|v| v.trim().parse().ok()))
    }
}
