//! In-memory XML element tree.
//!
//! Documents are loaded fully into memory with `quick-xml` and turned into a
//! tree of owned [`XmlNode`]s. Every node keeps its document-order index so
//! that path evaluation can return nodes in document order.
//!
//! Only what the extractor needs is kept: element names (as written,
//! including any namespace prefix), attributes, and the direct text of each
//! element, i.e. the text that appears before its first child element.
//! Direct text is kept verbatim, whitespace included.

pub mod decode;
pub mod path;

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

use crate::error::{XmlError, XmlResult};

pub use path::{resolve, resolve_all, split_expression, try_resolve, try_resolve_all, PathExpr};

/// One element of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<XmlNode>,
    order: usize,
}

impl XmlNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of an attribute, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Direct text as written. `None` when the element has none.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Position of this element in document order (root is 0).
    pub fn order(&self) -> usize {
        self.order
    }

    /// All elements below this one, in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack: Vec<&XmlNode> = self.children.iter().rev().collect();
        stack.reserve(16);
        Descendants { stack }
    }

    /// All elements below this one with the given name, in document order.
    pub fn find_all_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.descendants().filter(move |n| n.name == name)
    }
}

/// Pre-order iterator over the descendants of a node.
pub struct Descendants<'a> {
    stack: Vec<&'a XmlNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A parsed document.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    root: XmlNode,
    element_count: usize,
}

impl XmlDocument {
    /// Parse a document from a string.
    pub fn parse(content: &str) -> XmlResult<Self> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;
        let mut next_order = 0usize;
        let mut buf = Vec::new();

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| parse_error(&reader, e.to_string()))?;

            match event {
                Event::Start(ref e) => {
                    if root.is_some() && stack.is_empty() {
                        return Err(parse_error(&reader, "content after the root element"));
                    }
                    let node = start_node(e, next_order).map_err(|m| parse_error(&reader, m))?;
                    next_order += 1;
                    stack.push(node);
                }
                Event::Empty(ref e) => {
                    if root.is_some() && stack.is_empty() {
                        return Err(parse_error(&reader, "content after the root element"));
                    }
                    let node = start_node(e, next_order).map_err(|m| parse_error(&reader, m))?;
                    next_order += 1;
                    attach(&mut stack, &mut root, node);
                }
                Event::End(_) => {
                    if let Some(node) = stack.pop() {
                        attach(&mut stack, &mut root, node);
                    }
                }
                Event::Text(ref e) => {
                    let text = e
                        .decode()
                        .map_err(|err| parse_error(&reader, err.to_string()))?;
                    push_text(&mut stack, &text);
                }
                Event::CData(ref e) => {
                    let text = String::from_utf8_lossy(e).to_string();
                    push_text(&mut stack, &text);
                }
                Event::GeneralRef(ref e) => {
                    let resolved = match e.resolve_char_ref() {
                        Ok(Some(ch)) => ch.to_string(),
                        Ok(None) => {
                            let name = e
                                .decode()
                                .map_err(|err| parse_error(&reader, err.to_string()))?;
                            resolve_predefined_entity(&name)
                                .map(str::to_string)
                                .ok_or_else(|| {
                                    parse_error(&reader, format!("unknown entity '&{};'", name))
                                })?
                        }
                        Err(err) => return Err(parse_error(&reader, err.to_string())),
                    };
                    push_text(&mut stack, &resolved);
                }
                Event::Eof => break,
                _ => {}
            }

            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(parse_error(&reader, format!("unclosed element <{}>", open.name)));
        }

        let root = root.ok_or(XmlError::NoRoot)?;
        Ok(Self {
            root,
            element_count: next_order,
        })
    }

    /// Read, decode and parse a document file.
    ///
    /// The declared encoding (or BOM) is honoured; see [`decode`].
    pub fn from_file(path: impl AsRef<Path>) -> XmlResult<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let content = decode::decode_document(&bytes)?;
        Self::parse(&content)
    }

    pub fn root(&self) -> &XmlNode {
        &self.root
    }

    /// Number of elements in the document, root included.
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// Every element named `name` below the root, in document order.
    pub fn elements_named<'a>(&'a self, name: &'a str) -> Vec<&'a XmlNode> {
        self.root.find_all_named(name).collect()
    }
}

fn start_node(e: &BytesStart<'_>, order: usize) -> Result<XmlNode, String> {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| format!("bad attribute on <{}>: {}", name, err))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let raw = String::from_utf8_lossy(&attr.value).to_string();
        let value = unescape(&raw)
            .map_err(|err| format!("bad attribute value for '{}': {}", key, err))?
            .to_string();
        attributes.push((key, value));
    }

    Ok(XmlNode {
        name,
        attributes,
        text: None,
        children: Vec::new(),
        order,
    })
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => *root = Some(node),
    }
}

/// Only text before the first child element counts as direct text.
fn push_text(stack: &mut [XmlNode], text: &str) {
    if let Some(node) = stack.last_mut() {
        if node.children.is_empty() {
            node.text.get_or_insert_with(String::new).push_str(text);
        }
    }
}

fn parse_error(reader: &Reader<&[u8]>, message: impl Into<String>) -> XmlError {
    XmlError::ParseError {
        position: reader.buffer_position() as u64,
        message: message.into(),
    }
}
