//! Loss-free XML tree for package parts.
//!
//! Only what the generator edits is modelled: elements (with their raw start
//! tag kept byte-for-byte) and unescaped text. Everything else the reader
//! yields - declarations, comments, processing instructions, CDATA - is kept
//! as an owned event and written back unchanged.

use std::io::Write;

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::DocumentError;

/// A child of an element
#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(String),
    Other(Event<'static>),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// An element with its original start tag and ordered children
#[derive(Debug, Clone)]
pub struct Element {
    start: BytesStart<'static>,
    children: Vec<Node>,
    /// Written as `<x/>` while it has no children
    self_closing: bool,
}

impl Element {
    /// Create an empty element from a qualified name such as `w:r`
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            start: BytesStart::new(qualified_name.into()),
            children: Vec::new(),
            self_closing: true,
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.start.push_attribute((key, value));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Qualified tag name as written in the source
    pub fn name(&self) -> &[u8] {
        self.start.name().into_inner()
    }

    /// Tag name without its namespace prefix
    pub fn local_name(&self) -> &[u8] {
        self.start.local_name().into_inner()
    }

    /// Matches on the local name, ignoring the prefix
    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local.as_bytes()
    }

    /// Qualified name for a sibling element in the same namespace prefix
    pub fn qualify(&self, local: &str) -> String {
        match self.start.name().prefix() {
            Some(prefix) => format!("{}:{}", String::from_utf8_lossy(prefix.as_ref()), local),
            None => local.to_string(),
        }
    }

    /// Attribute value looked up by local name
    pub fn attribute(&self, local: &str) -> Option<String> {
        self.start
            .attributes()
            .flatten()
            .find(|attr| attr.key.local_name().as_ref() == local.as_bytes())
            .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(Node::as_element_mut)
    }

    /// First child element with the given local name
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.is(local))
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.child_elements_mut().find(|e| e.is(local))
    }

    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Keep the children `keep` accepts; it may edit a child before deciding
    pub fn retain_children<F>(&mut self, keep: F)
    where
        F: FnMut(&mut Node) -> bool,
    {
        self.children.retain_mut(keep);
    }

    /// Concatenated text of the direct text children
    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), DocumentError> {
        if self.children.is_empty() && self.self_closing {
            writer.write_event(Event::Empty(self.start.borrow()))?;
            return Ok(());
        }

        writer.write_event(Event::Start(self.start.borrow()))?;
        for child in &self.children {
            match child {
                Node::Element(element) => element.write_to(writer)?,
                Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
                Node::Other(event) => writer.write_event(event.borrow())?,
            }
        }
        writer.write_event(Event::End(self.start.to_end()))?;
        Ok(())
    }
}

/// A parsed XML part: prolog, root element and whatever trails it
#[derive(Debug, Clone)]
pub struct XmlTree {
    prolog: Vec<Event<'static>>,
    root: Element,
    epilog: Vec<Event<'static>>,
}

impl XmlTree {
    pub fn parse(bytes: &[u8]) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_reader(bytes);

        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut root: Option<Element> = None;
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let node = match reader.read_event()? {
                Event::Eof => break,
                Event::Start(start) => {
                    stack.push(Element {
                        start: start.into_owned(),
                        children: Vec::new(),
                        self_closing: false,
                    });
                    continue;
                }
                Event::End(end) => {
                    let element = stack.pop().ok_or_else(|| DocumentError::Unbalanced {
                        message: format!(
                            "closing tag </{}> without an open element",
                            String::from_utf8_lossy(end.name().as_ref())
                        ),
                    })?;
                    Node::Element(element)
                }
                Event::Empty(start) => Node::Element(Element {
                    start: start.into_owned(),
                    children: Vec::new(),
                    self_closing: true,
                }),
                Event::Text(text) if !stack.is_empty() => Node::Text(text.unescape()?.into_owned()),
                other => Node::Other(other.into_owned()),
            };

            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => match (node, root.is_some()) {
                    (Node::Element(element), false) => root = Some(element),
                    (Node::Element(_), true) => {
                        return Err(DocumentError::Unbalanced {
                            message: "more than one root element".to_string(),
                        })
                    }
                    (Node::Other(event), false) => prolog.push(event),
                    (Node::Other(event), true) => epilog.push(event),
                    (Node::Text(_), _) => unreachable!("text outside the root is kept raw"),
                },
            }
        }

        if let Some(open) = stack.last() {
            return Err(DocumentError::Unbalanced {
                message: format!(
                    "element <{}> is never closed",
                    String::from_utf8_lossy(open.name())
                ),
            });
        }

        let root = root.ok_or_else(|| DocumentError::Unbalanced {
            message: "no root element".to_string(),
        })?;

        Ok(Self {
            prolog,
            root,
            epilog,
        })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.prolog {
            writer.write_event(event.borrow())?;
        }
        self.root.write_to(&mut writer)?;
        for event in &self.epilog {
            writer.write_event(event.borrow())?;
        }
        Ok(writer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><!-- note --><w:body><w:p w14:paraId="1A2B"><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">A &amp; B </w:t></w:r></w:p><w:sectPr/></w:body></w:document>"#;

    #[test]
    fn test_round_trip_preserves_markup() {
        let tree = XmlTree::parse(SAMPLE.as_bytes()).unwrap();
        let out = String::from_utf8(tree.to_bytes().unwrap()).unwrap();
        assert_eq!(out, SAMPLE);
    }

    #[test]
    fn test_text_is_unescaped_in_tree() {
        let tree = XmlTree::parse(SAMPLE.as_bytes()).unwrap();
        let body = tree.root().child("body").unwrap();
        let t = body
            .child("p")
            .and_then(|p| p.child("r"))
            .and_then(|r| r.child("t"))
            .unwrap();
        assert_eq!(t.text_content(), "A & B ");
        assert_eq!(t.attribute("space").as_deref(), Some("preserve"));
    }

    #[test]
    fn test_new_children_expand_self_closing_element() {
        let mut tree = XmlTree::parse(br#"<w:p xmlns:w="urn:w"/>"#).unwrap();
        let name = tree.root().qualify("r");
        assert_eq!(name, "w:r");
        tree.root_mut()
            .push(Node::Element(Element::new(name).with_text("x<y")));
        let out = String::from_utf8(tree.to_bytes().unwrap()).unwrap();
        assert_eq!(out, r#"<w:p xmlns:w="urn:w"><w:r>x&lt;y</w:r></w:p>"#);
    }

    #[test]
    fn test_unclosed_element_is_rejected() {
        let err = XmlTree::parse(b"<a><b></b>").unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Unbalanced { .. } | DocumentError::Xml(_)
        ));
    }
}
