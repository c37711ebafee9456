//! Minimal element tree built from quick-xml events.
//!
//! Element names are stored without their namespace prefix so `kml:Folder`
//! and `Folder` are treated alike. Parsing never fails outright: on malformed
//! input every element opened before the error is kept.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let attributes = start
            .attributes()
            .flatten()
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                let value = attr
                    .unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                (key, value)
            })
            .collect();

        Self { name, attributes, ..Default::default() }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first child with this name, if not blank
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim()).filter(|t| !t.is_empty())
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Depth-first search for the first descendant with this name
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|c| if c.name == name { Some(c) } else { c.find(name) })
    }
}

/// Parse outcome: the (possibly partial) tree and the error that stopped it
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub root: Element,
    pub error: Option<String>,
}

/// Build an element tree under a synthetic unnamed root
pub fn parse_document(content: &str) -> ParsedDocument {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = vec![Element::default()];
    let mut buf = Vec::new();
    let mut error = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(start)) => stack.push(Element::from_start(&start)),
            Ok(Event::Empty(start)) => {
                let element = Element::from_start(&start);
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            Ok(Event::End(_)) => {
                if stack.len() > 1 {
                    if let Some(done) = stack.pop() {
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push(done);
                        }
                    }
                }
            }
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                let message = format!("XML error at position {}: {}", reader.buffer_position(), e);
                tracing::warn!("{}; keeping elements parsed so far", message);
                error = Some(message);
                break;
            }
        }
        buf.clear();
    }

    // Close anything left open by truncated or malformed input
    while stack.len() > 1 {
        if let Some(open) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.children.push(open);
            }
        }
    }

    ParsedDocument { root: stack.pop().unwrap_or_default(), error }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_prefixes_are_dropped() {
        let doc = parse_document(
            r#"<kml:kml xmlns:kml="http://www.opengis.net/kml/2.2"><kml:Folder id="f1"><kml:name>A &amp; B</kml:name></kml:Folder></kml:kml>"#,
        );
        assert!(doc.error.is_none());
        let folder = doc.root.find("Folder").unwrap();
        assert_eq!(folder.child_text("name"), Some("A & B"));
        assert_eq!(folder.attribute("id"), Some("f1"));
    }

    #[test]
    fn test_cdata_and_empty_elements() {
        let doc = parse_document("<a><b/><c><![CDATA[<p>hi</p>]]></c></a>");
        let a = doc.root.child("a").unwrap();
        assert_eq!(a.children.len(), 2);
        assert_eq!(a.child_text("c"), Some("<p>hi</p>"));
        assert_eq!(a.child_text("b"), None);
    }

    #[test]
    fn test_malformed_input_keeps_partial_tree() {
        let doc = parse_document("<a><b>one</b><c>two</x></a>");
        assert!(doc.error.is_some());
        let a = doc.root.child("a").unwrap();
        assert_eq!(a.child_text("b"), Some("one"));
    }
}
