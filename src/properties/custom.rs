// src/properties/custom.rs
//! Custom property specifications
//!
//! A custom property is declared as a list of `key:value` tokens:
//!
//! | token                 | meaning                                   |
//! |-----------------------|-------------------------------------------|
//! | `propattr_<a>:<v>`    | attribute `a` on the property node        |
//! | `keyattr_<a>:<v>`     | attribute `a` on the key node             |
//! | `key:<v>`             | text of the key node                      |
//! | `type:<v>`            | `string` or `selection`                   |
//! | `default:<v>`         | default value of the property             |
//! | `val<N>:<v>`          | text of the Nth value                     |
//! | `val<N>attr_<a>:<v>`  | attribute `a` on the Nth value            |
//!
//! Parsing is permissive: a token without `:` has an empty value and an
//! unrecognised prefix becomes an attribute on the property node. A key
//! without a `keyattr_display` token is displayed as its own text.

use super::dedup_nodes;
use crate::error::{Error, Result};
use crate::markup::{set_attr, Attrs, AttributedText, Node, Record};

/// Text used for a value that only received attributes
pub const VALUE_PLACEHOLDER: &str = "-";

/// Type tag for single-valued properties
pub const TYPE_STRING: &str = "string";

/// Type tag for multi-valued properties
pub const TYPE_SELECTION: &str = "selection";

/// One decoded specification token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    PropAttr { name: &'a str, value: &'a str },
    KeyAttr { name: &'a str, value: &'a str },
    Key(&'a str),
    Type(&'a str),
    Default(&'a str),
    Value { index: &'a str, value: &'a str },
    ValueAttr { index: &'a str, attr: &'a str, value: &'a str },
    /// Token with an empty name; carries nothing
    Empty,
}

/// Decode a single `key:value` token
pub fn decode_token(token: &str) -> Token<'_> {
    let (name, value) = token.split_once(':').unwrap_or((token, ""));
    let name = name.trim();

    if name.is_empty() {
        return Token::Empty;
    }
    if let Some(attr) = name.strip_prefix("propattr_") {
        return Token::PropAttr { name: attr, value };
    }
    if let Some(attr) = name.strip_prefix("keyattr_") {
        return Token::KeyAttr { name: attr, value };
    }
    match name {
        "key" => return Token::Key(value),
        "type" => return Token::Type(value),
        "default" => return Token::Default(value),
        _ => {}
    }
    if name.starts_with("val") {
        if let Some(pos) = name.find("attr") {
            let attr = &name[pos + "attr".len()..];
            let attr = attr.strip_prefix('_').unwrap_or(attr);
            return Token::ValueAttr {
                index: &name[..pos],
                attr,
                value,
            };
        }
        return Token::Value { index: name, value };
    }

    Token::PropAttr { name, value }
}

/// A custom property in the target dialect
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomProperty {
    /// Attributes on the property node itself
    pub attrs: Attrs,
    pub key: AttributedText,
    /// Declared type tag, if any
    pub kind: Option<String>,
    pub default: Option<String>,
    pub values: Vec<AttributedText>,
}

impl CustomProperty {
    /// Build a property from its specification tokens
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Self {
        let mut property = Self::default();
        let mut scalars: Vec<(String, String)> = Vec::new();
        let mut value_attrs: Vec<(String, String, String)> = Vec::new();

        for token in tokens {
            match decode_token(token.as_ref()) {
                Token::PropAttr { name, value } => set_attr(&mut property.attrs, name, value),
                Token::KeyAttr { name, value } => set_attr(&mut property.key.attrs, name, value),
                Token::Key(value) => property.key.text = Some(value.to_string()),
                Token::Type(value) => property.kind = Some(value.to_string()),
                Token::Default(value) => property.default = Some(value.to_string()),
                Token::Value { index, value } => {
                    match scalars.iter_mut().find(|(i, _)| i == index) {
                        Some(slot) => slot.1 = value.to_string(),
                        None => scalars.push((index.to_string(), value.to_string())),
                    }
                }
                Token::ValueAttr { index, attr, value } => {
                    value_attrs.push((index.to_string(), attr.to_string(), value.to_string()))
                }
                Token::Empty => {}
            }
        }

        // Each attribute token yields its own value node, consuming the
        // scalar with the same index
        for (index, attr, value) in value_attrs {
            let text = match scalars.iter().position(|(i, _)| *i == index) {
                Some(pos) => scalars.remove(pos).1,
                None => VALUE_PLACEHOLDER.to_string(),
            };
            property
                .values
                .push(AttributedText::new(text).with_attr(&attr, value));
        }
        property
            .values
            .extend(scalars.into_iter().map(|(_, text)| AttributedText::new(text)));

        if let Some(key) = property.key.text.clone().filter(|k| !k.is_empty()) {
            if property.key.attr("display").is_none() {
                property.key.attrs.insert(0, ("display".to_string(), key));
            }
        }
        property
    }

    /// Name of the property (the key node's text)
    pub fn name(&self) -> &str {
        self.key.text.as_deref().unwrap_or("")
    }

    /// Declared type, or one inferred from the number of values
    pub fn effective_kind(&self) -> &str {
        match &self.kind {
            Some(kind) if !kind.is_empty() => kind,
            _ if self.values.len() > 1 => TYPE_SELECTION,
            _ => TYPE_STRING,
        }
    }

    /// Check the type/value invariant
    pub fn validate(&self) -> Result<()> {
        if self.effective_kind() == TYPE_STRING && self.values.len() > 1 {
            return Err(Error::validation(
                "custom",
                format!(
                    "property '{}' is of type string but declares {} values",
                    self.name(),
                    self.values.len()
                ),
            ));
        }
        Ok(())
    }

    /// Render as a `custom_property` node in the target dialect
    pub fn to_node(&self) -> Node {
        let mut record = Record {
            attrs: self.attrs.clone(),
            fields: Vec::new(),
        };
        record.set("name", self.key.clone().into_node());
        record.set_text("type", self.effective_kind());
        if let Some(default) = &self.default {
            record.set_text("default", default.as_str());
        }
        let values: Vec<Node> = self.values.iter().cloned().map(AttributedText::into_node).collect();
        if let Some(values) = Node::from_items(values) {
            record.set("val", values);
        }
        Node::Record(record)
    }
}

/// Parse every specification into target-dialect nodes, rejecting
/// properties that break the type/value invariant
pub fn target_custom_properties<S: AsRef<str>>(specs: &[Vec<S>]) -> Result<Vec<Node>> {
    let mut nodes = Vec::with_capacity(specs.len());
    for spec in specs {
        let property = CustomProperty::from_tokens(spec);
        property.validate()?;
        nodes.push(property.to_node());
    }
    Ok(dedup_nodes(nodes))
}

/// Render a specification in the legacy dialect: `{key: [values]}`
///
/// The key comes from the `key` token, falling back to the first other
/// non-value token. Specifications without any key are skipped.
pub fn legacy_custom_property<S: AsRef<str>>(tokens: &[S]) -> Option<Node> {
    let mut key: Option<&str> = None;
    let mut fallback: Option<&str> = None;
    let mut values = Vec::new();

    for token in tokens {
        let token = token.as_ref();
        let (name, value) = token.split_once(':').unwrap_or((token, ""));
        if name.starts_with("val") {
            values.push(Node::scalar(value));
        } else if name == "key" {
            key = Some(value);
        } else if fallback.is_none() {
            fallback = Some(value);
        }
    }

    let key = key.or(fallback).map(str::trim).filter(|k| !k.is_empty())?;
    let value = Node::from_items(values).unwrap_or_else(|| Node::scalar(""));
    Some(Node::Record(Record::new().with(key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_decode_token() {
        assert_eq!(
            decode_token("propattr_mandatory:true"),
            Token::PropAttr { name: "mandatory", value: "true" }
        );
        assert_eq!(
            decode_token("keyattr_display:Mode"),
            Token::KeyAttr { name: "display", value: "Mode" }
        );
        assert_eq!(decode_token("key:mode"), Token::Key("mode"));
        assert_eq!(decode_token("type:selection"), Token::Type("selection"));
        assert_eq!(decode_token("default:fast"), Token::Default("fast"));
        assert_eq!(
            decode_token("val2:fast"),
            Token::Value { index: "val2", value: "fast" }
        );
        assert_eq!(
            decode_token("val2attr_display:Fast mode"),
            Token::ValueAttr { index: "val2", attr: "display", value: "Fast mode" }
        );
        // Values may contain further colons
        assert_eq!(
            decode_token("val1:http://example"),
            Token::Value { index: "val1", value: "http://example" }
        );
    }

    #[test]
    fn test_decode_permissive() {
        assert_eq!(decode_token("key"), Token::Key(""));
        assert_eq!(
            decode_token("color:blue"),
            Token::PropAttr { name: "color", value: "blue" }
        );
        assert_eq!(decode_token(":orphan"), Token::Empty);
    }

    #[test]
    fn test_value_attributes_consume_scalars() {
        let property = CustomProperty::from_tokens(&[
            "key:mode",
            "keyattr_display:Mode",
            "type:selection",
            "val1:fast",
            "val2:slow",
            "val3attr_display:Unset",
            "val1attr_display:Fast",
        ]);

        assert_eq!(property.name(), "mode");
        assert_eq!(property.key.attr("display"), Some("Mode"));
        let values: Vec<(Option<&str>, Option<&str>)> = property
            .values
            .iter()
            .map(|v| (v.text.as_deref(), v.attr("display")))
            .collect();
        assert_eq!(
            values,
            vec![
                (Some("-"), Some("Unset")),
                (Some("fast"), Some("Fast")),
                (Some("slow"), None)
            ]
        );
    }

    #[test]
    fn test_to_node_shape() {
        let property = CustomProperty::from_tokens(&[
            "propattr_mandatory:true",
            "key:UUID",
            "keyattr_display:UUID",
            "val1:",
        ]);
        let Node::Record(record) = property.to_node() else {
            panic!("custom property should be a record");
        };
        assert_eq!(record.attr("mandatory"), Some("true"));
        let names: Vec<&str> = record.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["name", "type", "val"]);
        assert_eq!(record.text("type"), Some("string"));
        assert_eq!(record.get("val"), Some(&Node::scalar("")));
    }

    #[test]
    fn test_string_property_from_tokens() {
        let property = CustomProperty::from_tokens(&["key:UUID", "type:string", "val1:abc"]);
        assert_eq!(property.key.text.as_deref(), Some("UUID"));
        assert_eq!(property.key.attr("display"), Some("UUID"));
        assert_eq!(property.effective_kind(), TYPE_STRING);
        assert_eq!(property.values, vec![AttributedText::new("abc")]);

        let Node::Record(record) = property.to_node() else {
            panic!("custom property should be a record");
        };
        assert_eq!(
            record.get("name"),
            Some(&Node::Text(AttributedText::new("UUID").with_attr("display", "UUID")))
        );
        assert_eq!(record.text("type"), Some("string"));
        assert_eq!(record.get("val"), Some(&Node::scalar("abc")));
    }

    #[test]
    fn test_selection_property_from_tokens() {
        let property = CustomProperty::from_tokens(&[
            "key:Mode",
            "val1attr_display:High",
            "val1:fast",
            "val2:slow",
        ]);
        assert_eq!(property.name(), "Mode");
        assert_eq!(property.effective_kind(), TYPE_SELECTION);
        assert_eq!(
            property.values,
            vec![
                AttributedText::new("fast").with_attr("display", "High"),
                AttributedText::new("slow"),
            ]
        );
        assert!(property.validate().is_ok());
    }

    #[test]
    fn test_default_token() {
        let property =
            CustomProperty::from_tokens(&["key:mode", "default:fast", "val1:fast", "val2:slow"]);
        assert_eq!(property.default.as_deref(), Some("fast"));
        assert!(property.attrs.is_empty());

        let Node::Record(record) = property.to_node() else {
            panic!("custom property should be a record");
        };
        let names: Vec<&str> = record.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["name", "type", "default", "val"]);
        assert_eq!(record.text("default"), Some("fast"));
    }

    #[test]
    fn test_type_inferred_from_values() {
        let property = CustomProperty::from_tokens(&["key:k", "val1:a", "val2:b"]);
        assert_eq!(property.effective_kind(), TYPE_SELECTION);
    }

    #[test]
    fn test_string_with_many_values_rejected() {
        let property = CustomProperty::from_tokens(&["key:k", "type:string", "val1:a", "val2:b"]);
        let err = property.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(err.field().as_deref(), Some("custom"));
    }

    #[test]
    fn test_target_properties_deduplicated() {
        let specs = vec![
            vec!["key:a".to_string(), "val1:x".to_string()],
            vec!["key:a".to_string(), "val1:x".to_string()],
            vec!["key:b".to_string()],
        ];
        let nodes = target_custom_properties(&specs).unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_legacy_shape() {
        let node = legacy_custom_property(&["key:mode", "val1:fast", "val2:slow"]).unwrap();
        let Node::Record(record) = node else {
            panic!("legacy property should be a record");
        };
        assert_eq!(record.get("mode").unwrap().items().len(), 2);

        let node = legacy_custom_property(&["key:UUID"]).unwrap();
        assert_eq!(node, Node::Record(Record::new().with("UUID", Node::scalar(""))));

        assert!(legacy_custom_property::<&str>(&[]).is_none());
    }
}
