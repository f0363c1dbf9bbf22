//! Reading and writing the legacy media XML.
//!
//! The legacy media source serves subtrees as XML text. These functions turn
//! that text into a [`LegacyNode`] tree and serialize single elements back
//! into markup, which the legacy normalizer needs for structured properties.

use mediacache_core::{LegacyChild, LegacyNode, NormalizeError};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

fn malformed(reason: impl ToString) -> NormalizeError {
    NormalizeError::MalformedXml {
        reason: reason.to_string(),
    }
}

fn element_from_start(e: &BytesStart<'_>) -> Result<LegacyNode, NormalizeError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(malformed)?
        .to_string();
    let mut node = LegacyNode::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(malformed)?
            .to_string();
        let value = attr.unescape_value().map_err(malformed)?.into_owned();
        node.attributes.push((key, value));
    }
    Ok(node)
}

fn attach(stack: &mut [LegacyNode], root: &mut Option<LegacyNode>, node: LegacyNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(LegacyChild::Element(node)),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

/// Parse legacy media XML into a tree rooted at the document element.
///
/// Whitespace-only text between elements is dropped. Any other text is
/// kept as written, surrounding spaces included.
pub fn parse_legacy_xml(xml: &str) -> Result<LegacyNode, NormalizeError> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<LegacyNode> = Vec::new();
    let mut root: Option<LegacyNode> = None;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(ref e) => stack.push(element_from_start(e)?),
            Event::Empty(ref e) => {
                let node = element_from_start(e)?;
                attach(&mut stack, &mut root, node);
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| malformed("unexpected closing tag"))?;
                attach(&mut stack, &mut root, node);
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(malformed)?;
                if text.trim().is_empty() {
                    continue;
                }
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(LegacyChild::Text(text.into_owned()));
                }
            }
            Event::CData(e) => {
                let text = String::from_utf8(e.into_inner().into_owned()).map_err(malformed)?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(LegacyChild::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(malformed("unclosed element at end of document"));
    }
    root.ok_or_else(|| malformed("document has no root element"))
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &LegacyNode) -> Result<(), NormalizeError> {
    let mut start = BytesStart::new(node.name.as_str());
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if node.children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(malformed);
    }

    writer.write_event(Event::Start(start)).map_err(malformed)?;
    for child in &node.children {
        match child {
            LegacyChild::Element(element) => write_node(writer, element)?,
            LegacyChild::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(malformed)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.name.as_str())))
        .map_err(malformed)
}

/// Serialize an element, its attributes and its whole subtree.
pub fn outer_xml(node: &LegacyNode) -> Result<String, NormalizeError> {
    let mut writer = Writer::new(Vec::new());
    write_node(&mut writer, node)?;
    String::from_utf8(writer.into_inner()).map_err(malformed)
}
