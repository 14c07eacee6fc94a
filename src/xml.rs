//! Owned XML element tree.
//!
//! Record-source responses are parsed with `quick-xml` into a small,
//! serde-serializable tree so raw records can be archived as JSON and
//! re-read later without the original response bodies.
//!
//! Name lookups accept either a qualified name (`"dc:title"`), matched
//! exactly, or a bare local name (`"title"`), matched against the part
//! after the prefix.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

/// Failure to turn a document into an element tree.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },
    #[error("document has no root element")]
    Empty,
    #[error("unbalanced end tag </{0}>")]
    Unbalanced(String),
}

/// A single element with its attributes, concatenated text and children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XmlElement {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    pub fn is(&self, name: &str) -> bool {
        if name.contains(':') {
            self.name == name
        } else {
            self.local_name() == name
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        if name.contains(':') {
            self.attributes.get(name).map(String::as_str)
        } else {
            self.attributes
                .iter()
                .find(|(k, _)| local_part(k) == name)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Trimmed text content, `None` when blank.
    pub fn text(&self) -> Option<&str> {
        let t = self.text.trim();
        if t.is_empty() {
            None
        } else {
            Some(t)
        }
    }

    /// `rdf:resource` attribute if present, otherwise the text content.
    ///
    /// EDM expresses links both ways depending on the provider.
    pub fn resource_or_text(&self) -> Option<&str> {
        self.attr("rdf:resource")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| self.text())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.is(name))
    }

    /// First matching element in depth-first document order, self excluded.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        for child in &self.children {
            if child.is(name) {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// All matching elements in depth-first document order, self excluded.
    pub fn find_all(&self, name: &str) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        self.collect(name, &mut out);
        out
    }

    fn collect<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.is(name) {
                out.push(child);
            }
            child.collect(name, out);
        }
    }
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

/// Parse a complete document and return its root element.
pub fn parse_document(input: &str) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader.read_event().map_err(|e| XmlError::Syntax {
            position: reader.buffer_position() as u64,
            message: e.to_string(),
        })?;

        match event {
            Event::Start(e) => stack.push(element_from_start(&e)),
            Event::Empty(e) => {
                let element = element_from_start(&e);
                attach(&mut stack, &mut root, element);
            }
            Event::End(e) => {
                let element = stack.pop().ok_or_else(|| {
                    XmlError::Unbalanced(String::from_utf8_lossy(e.name().as_ref()).into_owned())
                })?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(t) => {
                if let Some(current) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    current.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Syntax {
            position: input.len() as u64,
            message: format!("unclosed element <{}>", open.name),
        });
    }
    root.ok_or(XmlError::Empty)
}

fn element_from_start(start: &BytesStart<'_>) -> XmlElement {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        element.attributes.insert(key, value);
    }
    element
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}
