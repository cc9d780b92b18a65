// src/properties/migrate.rs
//! Legacy to target dialect migration
//!
//! Migration rewrites a property tree in place:
//!
//! 1. `imageType` is set to `virtualmachine`
//! 2. `_` separators in `version` become `-`
//! 3. deprecated `profiles` / `default_profile` sections are removed
//! 4. legacy custom properties become typed nodes
//!
//! Properties already in the target shape are left alone, so migrating a
//! migrated tree changes nothing.

use super::custom::{TYPE_SELECTION, TYPE_STRING};
use super::PropertyTree;
use crate::markup::{AttributedText, Node, Record};
use tracing::debug;

/// Image type marker written by migration
pub const IMAGE_TYPE: &str = "virtualmachine";

/// Apply the legacy to target migration
pub fn migrate_to_target(tree: &mut PropertyTree) {
    let body = tree.body_mut();
    body.set_text("imageType", IMAGE_TYPE);

    if let Some(version) = body.text("version").map(|v| v.replace('_', "-")) {
        body.set_text("version", version);
    }

    for deprecated in ["profiles", "default_profile"] {
        if body.remove(deprecated).is_some() {
            debug!("Removed deprecated section {}", deprecated);
        }
    }

    if let Some(custom) = body.get("custom_property").cloned() {
        let migrated: Vec<Node> = custom.into_items().into_iter().flat_map(migrate_custom).collect();
        match Node::from_items(migrated) {
            Some(node) => body.set("custom_property", node),
            None => {
                body.remove("custom_property");
            }
        }
    }
}

/// Whether a custom property node already has the target shape
fn is_target_shape(record: &Record) -> bool {
    record.contains("name") && record.contains("type")
}

fn migrate_custom(node: Node) -> Vec<Node> {
    match node {
        Node::Record(record) if is_target_shape(&record) => vec![Node::Record(record)],
        Node::Record(record) => record
            .fields
            .into_iter()
            .map(|(key, value)| migrate_legacy_field(key, value))
            .collect(),
        other => vec![other],
    }
}

/// Rewrite one legacy `key -> value(s)` pair as a typed property
fn migrate_legacy_field(key: String, value: Node) -> Node {
    let name = AttributedText::new(key.as_str())
        .with_attr("display", key.as_str())
        .into_node();

    let (kind, val) = match value {
        Node::List(items) => {
            let values = items
                .iter()
                .map(|item| {
                    let text = item.as_text().unwrap_or("");
                    AttributedText::new(text).with_attr("display", text).into_node()
                })
                .collect();
            (TYPE_SELECTION, Node::List(values))
        }
        Node::Scalar(text) => (TYPE_STRING, Node::Scalar(text)),
        Node::Text(text) => (TYPE_STRING, Node::Scalar(text.text.unwrap_or_default())),
        // Nested structure has no typed equivalent; keep it under its key
        Node::Record(record) => {
            return Node::Record(Record::new().with(&key, Node::Record(record)));
        }
    };

    Node::Record(
        Record::new()
            .with("name", name)
            .with("type", Node::scalar(kind))
            .with("val", val),
    )
}
