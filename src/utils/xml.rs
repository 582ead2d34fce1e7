//! Minimal XML element tree built with quick-xml.
//!
//! Provider XML is small and only queried by tag name, so the whole payload
//! is read into an owned tree. Tag and attribute names compare
//! case-insensitively, qualified names (`oaf:result`) included.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// Child of an element: either a nested element or a text run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlChild {
    Element(XmlNode),
    Text(String),
}

/// An XML element with its attributes and children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlChild>,
}

impl XmlNode {
    /// Parse a document; the returned node is a synthetic `#document` root.
    pub fn parse(xml: &str) -> Result<XmlNode, quick_xml::Error> {
        let mut reader = Reader::from_str(xml);
        let mut stack = vec![XmlNode {
            name: "#document".to_string(),
            ..Default::default()
        }];

        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(element(&e)),
                Event::Empty(e) => push_child(&mut stack, XmlChild::Element(element(&e))),
                Event::End(_) => {
                    if stack.len() > 1 {
                        if let Some(node) = stack.pop() {
                            push_child(&mut stack, XmlChild::Element(node));
                        }
                    }
                }
                Event::Text(t) => {
                    let text = match t.unescape() {
                        Ok(s) => s.into_owned(),
                        Err(_) => String::from_utf8_lossy(&t).into_owned(),
                    };
                    push_child(&mut stack, XmlChild::Text(text));
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    push_child(&mut stack, XmlChild::Text(text));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        // Close anything left open by a truncated document
        while stack.len() > 1 {
            if let Some(node) = stack.pop() {
                push_child(&mut stack, XmlChild::Element(node));
            }
        }
        Ok(stack.pop().unwrap_or_default())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct child elements
    pub fn elements(&self) -> impl Iterator<Item = &XmlNode> {
        self.children.iter().filter_map(|child| match child {
            XmlChild::Element(node) => Some(node),
            XmlChild::Text(_) => None,
        })
    }

    /// First descendant element with the given name (document order)
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        for child in self.elements() {
            if child.name.eq_ignore_ascii_case(name) {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// All descendant elements with the given name (document order)
    pub fn find_all(&self, name: &str) -> Vec<&XmlNode> {
        let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    fn collect<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlNode>) {
        for child in self.elements() {
            if child.name.eq_ignore_ascii_case(name) {
                found.push(child);
            }
            child.collect(name, found);
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Concatenated text of this element and its descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.append_text(&mut out);
        out
    }

    fn append_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlChild::Text(text) => out.push_str(text),
                XmlChild::Element(node) => node.append_text(out),
            }
        }
    }

    /// Trimmed text of the first descendant named `name`; empty counts as absent.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.find(name)
            .map(|node| node.text().trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

fn element(start: &BytesStart) -> XmlNode {
    let attributes = start
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = match attr.unescape_value() {
                Ok(v) => v.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            (key, value)
        })
        .collect();

    XmlNode {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        attributes,
        children: Vec::new(),
    }
}

fn push_child(stack: &mut [XmlNode], child: XmlChild) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(child);
    }
}
