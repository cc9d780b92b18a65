// src/properties/mod.rs
//! Image property documents
//!
//! `image_properties.xml` describes a VM package: identity, resource
//! bounds, bootstrap files and custom properties. Two dialects exist:
//!
//! - the **legacy** dialect, where a custom property is a flat
//!   `<custom_property><KEY>value</KEY></custom_property>` mapping
//! - the **target** dialect, where each custom property is a typed node
//!   with `name`, `type` and one or more `val` children
//!
//! HA packages also carry `system_generated_properties.xml`, a list of
//! variables the platform fills in at deployment time.

pub mod bootstrap;
pub mod custom;
pub mod migrate;
pub mod template;

use crate::error::{Error, Result};
use crate::markup::{Document, Node, Record};
use std::collections::HashSet;
use std::path::Path;

/// File name of the image property document inside a package
pub const IMAGE_PROPERTIES_FILE: &str = "image_properties.xml";

/// File name of the system-generated property document inside a package
pub const SYSTEM_PROPERTIES_FILE: &str = "system_generated_properties.xml";

const IMAGE_PROPERTIES_ROOT: &str = "image_properties";
const SYSTEM_PROPERTIES_ROOT: &str = "system_generated_properties";

/// The property tree of one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTree {
    document: Document,
}

impl PropertyTree {
    /// Empty tree with the `image_properties` root
    pub fn new() -> Self {
        Self {
            document: Document::new(IMAGE_PROPERTIES_ROOT),
        }
    }

    /// Wrap a parsed document, checking the root element
    pub fn from_document(document: Document) -> Result<Self> {
        if document.root != IMAGE_PROPERTIES_ROOT {
            return Err(Error::schema(
                IMAGE_PROPERTIES_FILE,
                format!(
                    "expected {} root element, found {}",
                    IMAGE_PROPERTIES_ROOT, document.root
                ),
            ));
        }
        Ok(Self { document })
    }

    pub fn parse(content: &str) -> Result<Self> {
        Self::from_document(Document::parse(content, IMAGE_PROPERTIES_FILE)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_document(Document::load(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.document.save(path)
    }

    pub fn to_xml(&self) -> Result<String> {
        self.document.to_xml()
    }

    /// Top-level fields of the tree
    pub fn body(&self) -> &Record {
        &self.document.body
    }

    pub fn body_mut(&mut self) -> &mut Record {
        &mut self.document.body
    }

    /// Bootstrap file names referenced by `bootstrap_file` nodes, in order
    /// and without duplicates
    pub fn bootstrap_sources(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.body()
            .get("bootstrap_file")
            .map(Node::items)
            .unwrap_or_default()
            .into_iter()
            .filter_map(Node::as_text)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter(|name| seen.insert(name.to_string()))
            .map(str::to_string)
            .collect()
    }
}

impl Default for PropertyTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the `system_generated_properties.xml` document
pub fn system_properties_document(properties: Vec<Node>) -> Document {
    let mut document = Document::new(SYSTEM_PROPERTIES_ROOT);
    if let Some(node) = Node::from_items(properties) {
        document.body.set("system_property", node);
    }
    document
}

/// Collapse structurally identical nodes, keeping the first occurrence
pub fn dedup_nodes(nodes: Vec<Node>) -> Vec<Node> {
    let mut seen = HashSet::new();
    nodes
        .into_iter()
        .filter(|node| seen.insert(node.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_root_checked() {
        let err = PropertyTree::parse("<other></other>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaError);
        assert!(PropertyTree::parse("<image_properties></image_properties>").is_ok());
    }

    #[test]
    fn test_bootstrap_sources() {
        let tree = PropertyTree::parse(
            r#"<image_properties>
  <bootstrap_file mnt_pnt="/day0" parse="true" vm="1">day0.txt</bootstrap_file>
  <bootstrap_file mnt_pnt="/day0" parse="true" vm="2">day0.txt</bootstrap_file>
  <bootstrap_file mnt_pnt="/lic" parse="false" vm="0">license.txt</bootstrap_file>
</image_properties>"#,
        )
        .unwrap();
        assert_eq!(tree.bootstrap_sources(), vec!["day0.txt", "license.txt"]);
    }

    #[test]
    fn test_dedup_keeps_first() {
        let nodes = vec![Node::scalar("a"), Node::scalar("b"), Node::scalar("a")];
        assert_eq!(dedup_nodes(nodes), vec![Node::scalar("a"), Node::scalar("b")]);
    }

    #[test]
    fn test_system_properties_document() {
        let empty = system_properties_document(Vec::new());
        assert_eq!(
            empty.to_fragment().unwrap(),
            "<system_generated_properties/>\n"
        );

        let property = Record::new()
            .with("name", Node::scalar("INSIDE_VLAN_1"))
            .with("val", Node::scalar(""));
        let doc = system_properties_document(vec![Node::Record(property)]);
        assert!(doc.to_fragment().unwrap().contains("<system_property>\n    <name>INSIDE_VLAN_1</name>"));
    }
}
