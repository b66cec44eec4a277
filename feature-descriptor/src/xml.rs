//! Minimal element tree built from quick-xml events.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::{DescriptorError, DescriptorResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> DescriptorResult<Self> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| DescriptorError::Malformed(format!("invalid element name: {e}")))?
            .to_string();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| DescriptorError::Malformed(e.to_string()))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| DescriptorError::Malformed(format!("invalid attribute name: {e}")))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| DescriptorError::Malformed(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Descendants (not including `self`) with the given tag, in document order.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in self.child_elements() {
            if child.name == name {
                out.push(child);
            }
            child.collect_named(name, out);
        }
    }
}

/// Parse a document into its root element.
pub(crate) fn parse_document(text: &str) -> DescriptorResult<Element> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(Element::open(&start)?),
            Ok(Event::Empty(start)) => {
                let element = Element::open(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| {
                    DescriptorError::Malformed("closing tag without opening tag".to_string())
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|e| DescriptorError::Malformed(e.to_string()))?;
                push_text(&mut stack, &text)?;
            }
            Ok(Event::CData(data)) => {
                let data = String::from_utf8(data.into_inner().into_owned())
                    .map_err(|e| DescriptorError::Malformed(format!("invalid CDATA: {e}")))?;
                push_text(&mut stack, &data)?;
            }
            Ok(Event::Eof) => break,
            // Declarations, comments, processing instructions, doctypes
            Ok(_) => {}
            Err(e) => {
                return Err(DescriptorError::Malformed(format!(
                    "at position {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(DescriptorError::Malformed(format!(
            "unclosed element <{}>",
            open.name
        )));
    }
    root.ok_or_else(|| DescriptorError::Malformed("document has no root element".to_string()))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> DescriptorResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(DescriptorError::Malformed(
            "more than one root element".to_string(),
        ));
    }
    *root = Some(element);
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) -> DescriptorResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Text(text.to_string()));
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(DescriptorError::Malformed(
            "text outside the root element".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_text_content() {
        let root = parse_document("<a>one<b>two<c>three</c></b>four</a>").unwrap();
        assert_eq!(root.name, "a");
        assert_eq!(root.text_content(), "onetwothreefour");
    }

    #[test]
    fn descendants_in_document_order() {
        let root =
            parse_document(r#"<r><s id="1"/><x><s id="2"><s id="3"/></s></x><s id="4"/></r>"#)
                .unwrap();
        let ids: Vec<_> = root
            .descendants_named("s")
            .into_iter()
            .filter_map(|s| s.attribute("id"))
            .collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn entities_and_cdata() {
        let root = parse_document("<a x=\"1 &lt; 2\">a &amp; b<![CDATA[<raw>]]></a>").unwrap();
        assert_eq!(root.attribute("x"), Some("1 < 2"));
        assert_eq!(root.text_content(), "a & b<raw>");
    }

    #[test]
    fn mismatched_tags_are_malformed() {
        assert!(parse_document("<a><b></a></b>").is_err());
    }

    #[test]
    fn unclosed_root_is_malformed() {
        assert!(parse_document("<a><b/>").is_err());
    }

    #[test]
    fn two_roots_are_malformed() {
        assert!(parse_document("<a/><b/>").is_err());
    }

    #[test]
    fn empty_document_is_malformed() {
        assert!(parse_document("<?xml version=\"1.0\"?>\n<!-- nothing -->").is_err());
    }
}
