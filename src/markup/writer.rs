// src/markup/writer.rs
//! Markup rendering from the [`Node`] model

use super::{Document, Node};
use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use regex::Regex;
use std::sync::LazyLock;

static ELEMENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9._-]*$").unwrap());

const INDENT_SIZE: usize = 2;

/// Whether `name` can be used as an element or attribute name
pub fn is_valid_name(name: &str) -> bool {
    ELEMENT_NAME.is_match(name)
}

/// What precedes the root element
#[derive(Debug, Clone, Copy)]
pub(super) enum Prolog<'a> {
    None,
    Declaration,
    Comment(&'a str),
}

/// Render a document, one element per line with two-space indentation
pub(super) fn render_document(document: &Document, prolog: Prolog<'_>) -> Result<String> {
    let label = document.root.as_str();
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_SIZE);

    match prolog {
        Prolog::None => {}
        Prolog::Declaration => {
            write(&mut writer, label, Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?
        }
        Prolog::Comment(comment) => {
            if comment.contains("--") {
                return Err(Error::schema(label, "comment text may not contain '--'"));
            }
            write(&mut writer, label, Event::Comment(BytesText::from_escaped(comment)))?
        }
    }

    write_element(
        &mut writer,
        label,
        &document.root,
        &document.body.attrs,
        Body::Fields(&document.body.fields),
    )?;

    let mut out = String::from_utf8(writer.into_inner())
        .map_err(|e| Error::schema(label, format!("rendered markup is not UTF-8: {}", e)))?;
    out.push('\n');
    Ok(out)
}

/// Content of one element
enum Body<'n> {
    Text(Option<&'n str>),
    Fields(&'n [(String, Node)]),
}

fn write_node(writer: &mut Writer<Vec<u8>>, label: &str, name: &str, node: &Node) -> Result<()> {
    match node {
        Node::List(items) => {
            for item in items {
                write_node(writer, label, name, item)?;
            }
            Ok(())
        }
        Node::Scalar(text) => write_element(writer, label, name, &[], Body::Text(Some(text))),
        Node::Text(text) => {
            write_element(writer, label, name, &text.attrs, Body::Text(text.text.as_deref()))
        }
        Node::Record(record) => {
            write_element(writer, label, name, &record.attrs, Body::Fields(&record.fields))
        }
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    label: &str,
    name: &str,
    attrs: &[(String, String)],
    body: Body<'_>,
) -> Result<()> {
    if !is_valid_name(name) {
        return Err(Error::schema(label, format!("'{}' is not a valid element name", name)));
    }
    let mut start = BytesStart::new(name);
    for (key, value) in attrs {
        if !is_valid_name(key) {
            return Err(Error::schema(
                label,
                format!("'{}' is not a valid attribute name on <{}>", key, name),
            ));
        }
        start.push_attribute((key.as_str(), value.as_str()));
    }

    match body {
        Body::Text(None) | Body::Fields([]) => write(writer, label, Event::Empty(start)),
        Body::Text(Some(text)) => {
            write(writer, label, Event::Start(start))?;
            write(writer, label, Event::Text(BytesText::new(text)))?;
            write(writer, label, Event::End(BytesEnd::new(name)))
        }
        Body::Fields(fields) => {
            write(writer, label, Event::Start(start))?;
            for (child, node) in fields {
                write_node(writer, label, child, node)?;
            }
            write(writer, label, Event::End(BytesEnd::new(name)))
        }
    }
}

fn write(writer: &mut Writer<Vec<u8>>, label: &str, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::schema(label, format!("failed to render markup: {}", e)))
}
