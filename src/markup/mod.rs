// src/markup/mod.rs
//! Markup document model
//!
//! Package manifests and property documents are small XML files whose
//! elements take one of a few shapes. Instead of probing untyped maps for
//! the presence of keys, every element body is decoded into a [`Node`]:
//!
//! - `<vcpu_min>1</vcpu_min>` is a [`Node::Scalar`]
//! - `<name display="UUID">UUID</name>` is a [`Node::Text`]
//! - an element with child elements is a [`Node::Record`]
//! - sibling elements sharing one tag collapse into a [`Node::List`]

mod reader;
mod writer;

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

pub use writer::is_valid_name;

use writer::Prolog;

/// Ordered attribute list of one element
pub type Attrs = Vec<(String, String)>;

/// Look up an attribute by name
pub fn get_attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Set an attribute, replacing an existing value in place
pub fn set_attr(attrs: &mut Attrs, name: &str, value: impl Into<String>) {
    let value = value.into();
    match attrs.iter_mut().find(|(key, _)| key == name) {
        Some(slot) => slot.1 = value,
        None => attrs.push((name.to_string(), value)),
    }
}

/// Body of one element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// Bare text content
    Scalar(String),
    /// Text carrying attributes
    Text(AttributedText),
    /// Nested element with ordered children
    Record(Record),
    /// Repeated sibling elements sharing one tag
    List(Vec<Node>),
}

impl Node {
    /// Shorthand for a scalar node
    pub fn scalar(value: impl Into<String>) -> Self {
        Self::Scalar(value.into())
    }

    /// Text content of a scalar or attributed text node
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Scalar(text) => Some(text),
            Self::Text(text) => Some(text.text.as_deref().unwrap_or("")),
            Self::Record(_) | Self::List(_) => None,
        }
    }

    /// The occurrences this node stands for (a list's items, or itself)
    pub fn items(&self) -> Vec<&Node> {
        match self {
            Self::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    /// Owned variant of [`Node::items`]
    pub fn into_items(self) -> Vec<Node> {
        match self {
            Self::List(items) => items,
            other => vec![other],
        }
    }

    /// Collapse occurrences back into a node: none, a single node, or a list
    pub fn from_items(mut items: Vec<Node>) -> Option<Node> {
        match items.len() {
            0 => None,
            1 => items.pop(),
            _ => Some(Self::List(items)),
        }
    }

    /// Whether this node is a list
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}

/// Text content with attributes, e.g. `<val display="High">fast</val>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AttributedText {
    pub attrs: Attrs,
    pub text: Option<String>,
}

impl AttributedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            attrs: Vec::new(),
            text: Some(text.into()),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        set_attr(&mut self.attrs, name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        get_attr(&self.attrs, name)
    }

    /// Demote to a scalar when there are no attributes
    pub fn into_node(self) -> Node {
        if self.attrs.is_empty() {
            Node::Scalar(self.text.unwrap_or_default())
        } else {
            Node::Text(self)
        }
    }
}

/// Element with attributes and ordered child fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Record {
    pub attrs: Attrs,
    pub fields: Vec<(String, Node)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, node)| node)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.fields
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|(_, node)| node)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Text of a scalar or attributed child
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Node::as_text)
    }

    /// Set a field, replacing an existing one in place or appending
    pub fn set(&mut self, name: &str, node: Node) {
        match self.get_mut(name) {
            Some(slot) => *slot = node,
            None => self.fields.push((name.to_string(), node)),
        }
    }

    /// Set a scalar field
    pub fn set_text(&mut self, name: &str, value: impl Into<String>) {
        self.set(name, Node::Scalar(value.into()));
    }

    /// Add another occurrence of a field, turning it into a list if needed
    pub fn append(&mut self, name: &str, node: Node) {
        match self.get_mut(name) {
            Some(Node::List(items)) => items.push(node),
            Some(slot) => {
                let previous = std::mem::replace(slot, Node::List(Vec::new()));
                *slot = Node::List(vec![previous, node]);
            }
            None => self.fields.push((name.to_string(), node)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Node> {
        let index = self.fields.iter().position(|(key, _)| key == name)?;
        Some(self.fields.remove(index).1)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        get_attr(&self.attrs, name)
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        set_attr(&mut self.attrs, name, value);
    }

    /// Builder-style field setter
    pub fn with(mut self, name: &str, node: Node) -> Self {
        self.set(name, node);
        self
    }
}

/// A complete markup document: one root element and its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: String,
    pub body: Record,
}

impl Document {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            body: Record::new(),
        }
    }

    /// Parse a document; `label` names it in error messages
    pub fn parse(content: &str, label: &str) -> Result<Self> {
        reader::parse_document(content, label)
    }

    /// Read and parse a document from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(&content, &label)
    }

    /// Render with an XML declaration
    pub fn to_xml(&self) -> Result<String> {
        writer::render_document(self, Prolog::Declaration)
    }

    /// Render without an XML declaration
    pub fn to_fragment(&self) -> Result<String> {
        writer::render_document(self, Prolog::None)
    }

    /// Render with a leading comment line instead of a declaration
    pub fn to_xml_with_comment(&self, comment: &str) -> Result<String> {
        writer::render_document(self, Prolog::Comment(comment))
    }

    /// Write the document to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_xml()?).map_err(|e| Error::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_builds_list() {
        let mut record = Record::new();
        record.append("val", Node::scalar("a"));
        assert_eq!(record.get("val"), Some(&Node::scalar("a")));

        record.append("val", Node::scalar("b"));
        record.append("val", Node::scalar("c"));
        let items = record.get("val").unwrap().items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].as_text(), Some("c"));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut record = Record::new()
            .with("name", Node::scalar("asav"))
            .with("version", Node::scalar("9_8"));
        record.set_text("name", "ftdv");
        assert_eq!(record.fields[0], ("name".to_string(), Node::scalar("ftdv")));
        assert_eq!(record.remove("version"), Some(Node::scalar("9_8")));
        assert!(!record.contains("version"));
    }

    #[test]
    fn test_from_items() {
        assert_eq!(Node::from_items(vec![]), None);
        assert_eq!(Node::from_items(vec![Node::scalar("x")]), Some(Node::scalar("x")));
        assert!(Node::from_items(vec![Node::scalar("x"), Node::scalar("y")])
            .unwrap()
            .is_list());
    }

    #[test]
    fn test_attributed_text_demotes() {
        assert_eq!(AttributedText::new("fast").into_node(), Node::scalar("fast"));
        let node = AttributedText::new("fast").with_attr("display", "High").into_node();
        assert!(matches!(node, Node::Text(ref t) if t.attr("display") == Some("High")));
    }
}
