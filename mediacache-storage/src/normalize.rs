//! Value normalization.
//!
//! Media reaches the cache in three shapes: search-index rows, nodes of the
//! legacy media tree, and repository entities. Each is flattened into one
//! [`CanonicalValueMap`] so nothing downstream cares where a value came from,
//! except for the origin flag carried by [`CacheValues`].

use crate::legacy_xml::outer_xml;
use mediacache_core::{
    fields, CacheValues, CanonicalValueMap, LegacyNode, MediaEntity, NormalizeError,
    SearchResultRow, ValueOrigin, DATE_FORMAT,
};
use std::sync::Arc;
use uuid::Uuid;

/// The source a value map is built from.
#[derive(Debug, Clone, Copy)]
pub enum MediaSource<'a> {
    SearchRow(&'a SearchResultRow),
    LegacyNode {
        node: &'a LegacyNode,
        /// Keep a handle to the node in the resulting entry.
        retain: bool,
    },
    Entity {
        entity: &'a MediaEntity,
        /// Display name of the creator, resolved by the caller.
        creator_name: Option<&'a str>,
    },
}

impl MediaSource<'_> {
    /// Build the cache values for this source.
    pub fn normalize(self) -> Result<CacheValues, NormalizeError> {
        match self {
            Self::SearchRow(row) => from_search_row(row),
            Self::LegacyNode { node, retain } => from_legacy_node(node, retain),
            Self::Entity {
                entity,
                creator_name,
            } => Ok(from_entity(entity, creator_name)),
        }
    }
}

/// Normalize a search-index row.
///
/// Fields are copied verbatim. A row without a node id in either id field
/// means the index schema does not match and fails loudly.
pub fn from_search_row(row: &SearchResultRow) -> Result<CacheValues, NormalizeError> {
    let node_id = row.node_id().ok_or(NormalizeError::MissingNodeId)?;

    let mut values = row.fields.clone();
    values.insert_if_absent(fields::ID, node_id.to_string());
    values.backfill_required();

    Ok(CacheValues::new(values, ValueOrigin::SearchIndex))
}

/// Normalize a node of the legacy media tree.
///
/// The node's own attributes come first, and a key that is already present
/// is never overwritten by a later attribute. Attribute-less child elements
/// are user properties; when such an element has no text but nests other
/// elements, its serialized markup is the value.
pub fn from_legacy_node(node: &LegacyNode, retain: bool) -> Result<CacheValues, NormalizeError> {
    if node.media_id().is_none() {
        return Err(NormalizeError::MissingIdentity {
            source_kind: "legacy media node",
        });
    }

    let mut values = CanonicalValueMap::with_capacity(node.attributes.len() + 8);
    values.insert(fields::NODE_NAME, node.attribute(fields::NODE_NAME).unwrap_or(""));
    values.insert(fields::NODE_TYPE_ALIAS, node.name.as_str());

    for (name, value) in &node.attributes {
        values.insert_if_absent(name.as_str(), value.as_str());
    }

    // Media stored before keys existed.
    values.insert_if_absent(fields::KEY, Uuid::nil().to_string());

    for property in node.elements().filter(|e| !e.has_attributes()) {
        let mut value = property.text_content();
        if value.is_empty() && property.has_elements() {
            value = outer_xml(property)?;
        }
        values.insert(property.name.as_str(), value);
    }

    values.backfill_required();

    let cache_values = CacheValues::new(values, ValueOrigin::LegacyTree);
    Ok(if retain {
        cache_values.with_legacy_node(Arc::new(node.clone()))
    } else {
        cache_values
    })
}

/// Normalize a repository entity.
///
/// The writer is always reported as the creator, the template is always
/// `"0"` and the url name is always empty. Properties whose value is null
/// are left out.
pub fn from_entity(entity: &MediaEntity, creator_name: Option<&str>) -> CacheValues {
    let creator_name = creator_name.unwrap_or("");
    let mut values = CanonicalValueMap::with_capacity(17 + entity.properties.len());

    values.insert(fields::ID, entity.id.to_string());
    values.insert(fields::KEY, entity.key.to_string());
    values.insert(fields::PARENT_ID, entity.parent_id.to_string());
    values.insert(fields::LEVEL, entity.level.to_string());
    values.insert(fields::CREATOR_ID, entity.creator_id.to_string());
    values.insert(fields::CREATOR_NAME, creator_name);
    values.insert(fields::WRITER_ID, entity.creator_id.to_string());
    values.insert(fields::WRITER_NAME, creator_name);
    values.insert(fields::TEMPLATE, "0");
    values.insert(fields::URL_NAME, "");
    values.insert(fields::SORT_ORDER, entity.sort_order.to_string());
    values.insert(
        fields::CREATE_DATE,
        entity.create_date.format(DATE_FORMAT).to_string(),
    );
    values.insert(
        fields::UPDATE_DATE,
        entity.update_date.format(DATE_FORMAT).to_string(),
    );
    values.insert(fields::NODE_NAME, entity.name.as_str());
    values.insert(fields::PATH, entity.path.as_str());
    values.insert(fields::NODE_TYPE, entity.media_type.id.to_string());
    values.insert(fields::NODE_TYPE_ALIAS, entity.media_type.alias.as_str());

    for property in &entity.properties {
        if let Some(value) = property.value_string() {
            values.insert(property.alias.as_str(), value);
        }
    }

    CacheValues::new(values, ValueOrigin::Repository)
}
