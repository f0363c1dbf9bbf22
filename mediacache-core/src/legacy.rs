//! In-memory model of the legacy media XML tree.
//!
//! The legacy media source hands out whole subtrees as XML. Media nodes are
//! elements carrying attributes (`id`, `parentID`, `path`, ...); user-defined
//! properties are attribute-less child elements whose text is the value.

use crate::identity::MediaId;
use serde::{Deserialize, Serialize};

/// A child of a legacy element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegacyChild {
    Element(LegacyNode),
    Text(String),
}

/// An element of the legacy media tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<LegacyChild>,
}

impl LegacyNode {
    /// Create an element with no attributes and no children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder: add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder: add a child element.
    pub fn with_child(mut self, child: LegacyNode) -> Self {
        self.children.push(LegacyChild::Element(child));
        self
    }

    /// Builder: add a text child.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(LegacyChild::Text(text.into()));
        self
    }

    /// Get an attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the element carries any attribute.
    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    /// The `id` attribute parsed as a media id.
    pub fn media_id(&self) -> Option<MediaId> {
        self.attribute("id").and_then(|v| v.trim().parse().ok())
    }

    /// Child elements in document order. Restartable: every call starts
    /// a fresh pass.
    pub fn elements(&self) -> impl Iterator<Item = &LegacyNode> {
        self.children.iter().filter_map(|child| match child {
            LegacyChild::Element(node) => Some(node),
            LegacyChild::Text(_) => None,
        })
    }

    /// Whether the element has at least one child element.
    pub fn has_elements(&self) -> bool {
        self.elements().next().is_some()
    }

    /// Concatenated text of the element and all its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                LegacyChild::Text(text) => out.push_str(text),
                LegacyChild::Element(node) => node.collect_text(out),
            }
        }
    }

    /// Find the element whose `id` attribute equals `id`, searching this
    /// element first and then its descendants depth-first.
    pub fn find_by_id(&self, id: MediaId) -> Option<&LegacyNode> {
        if self.media_id() == Some(id) {
            return Some(self);
        }
        self.elements().find_map(|child| child.find_by_id(id))
    }
}
