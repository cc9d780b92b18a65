// src/markup/reader.rs
//! Markup parsing into the [`Node`] model

use super::{Attrs, Document, Node, Record};
use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// An element that is still open while reading
struct Frame {
    name: String,
    attrs: Attrs,
    fields: Vec<(String, Node)>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>, label: &str) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::schema(label, format!("bad attribute: {}", e)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::schema(label, format!("bad attribute value: {}", e)))?;
            attrs.push((key, value.into_owned()));
        }
        Ok(Self {
            name,
            attrs,
            fields: Vec::new(),
            text: String::new(),
        })
    }

    /// Close the element and decode its body
    fn close(self) -> (String, Node) {
        let node = if !self.fields.is_empty() {
            Node::Record(Record {
                attrs: self.attrs,
                fields: self.fields,
            })
        } else if self.attrs.is_empty() {
            Node::Scalar(self.text)
        } else {
            let text = if self.text.is_empty() {
                None
            } else {
                Some(self.text)
            };
            Node::Text(super::AttributedText {
                attrs: self.attrs,
                text,
            })
        };
        (self.name, node)
    }

    fn append(&mut self, name: &str, node: Node) {
        let mut record = Record {
            attrs: Vec::new(),
            fields: std::mem::take(&mut self.fields),
        };
        record.append(name, node);
        self.fields = record.fields;
    }
}

pub(super) fn parse_document(content: &str, label: &str) -> Result<Document> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut document: Option<Document> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::schema(
                label,
                format!("malformed markup at byte {}: {}", reader.buffer_position(), e),
            )
        })?;

        match event {
            Event::Start(start) => {
                if stack.is_empty() && document.is_some() {
                    return Err(Error::schema(label, "more than one root element"));
                }
                stack.push(Frame::open(&start, label)?);
            }
            Event::Empty(start) => {
                let frame = Frame::open(&start, label)?;
                close_frame(frame, &mut stack, &mut document, label)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| Error::schema(label, format!("bad text: {}", e)))?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| Error::schema(label, "unbalanced closing tag"))?;
                close_frame(frame, &mut stack, &mut document, label)?;
            }
            Event::Eof => break,
            // Declarations, comments and processing instructions carry no data
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::schema(label, "unexpected end of document"));
    }
    document.ok_or_else(|| Error::schema(label, "document has no root element"))
}

fn close_frame(
    frame: Frame,
    stack: &mut [Frame],
    document: &mut Option<Document>,
    label: &str,
) -> Result<()> {
    let (name, node) = frame.close();
    match stack.last_mut() {
        Some(parent) => parent.append(&name, node),
        None => {
            if document.is_some() {
                return Err(Error::schema(label, "more than one root element"));
            }
            let body = match node {
                Node::Record(record) => record,
                Node::Text(text) => Record {
                    attrs: text.attrs,
                    fields: Vec::new(),
                },
                _ => Record::new(),
            };
            *document = Some(Document { root: name, body });
        }
    }
    Ok(())
}
