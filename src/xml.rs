//! Generic XML element tree.
//!
//! Device responses are parsed into an [`XmlElement`] tree and read through
//! optional accessors. Nothing here knows about the SoundTouch protocol; the
//! typed records are built on top of it in `decoders`.

use crate::error::{Result, SoundTouchError};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::Writer;
use std::io::Cursor;

/// A labelled XML element: name, ordered attributes, text and children
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    /// Create an empty element with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a document and return its root element
    ///
    /// Whitespace around text nodes is trimmed. Prolog, comments and
    /// processing instructions are ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => stack.push(Self::from_start(e)?),
                Ok(Event::Empty(ref e)) => {
                    let element = Self::from_start(e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element)?;
                    }
                }
                Ok(Event::Text(ref e)) => {
                    let text = e
                        .unescape()
                        .map_err(|err| SoundTouchError::Xml(err.to_string()))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(SoundTouchError::Xml(format!(
                        "parse error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(SoundTouchError::Xml("unexpected end of document".to_string()));
        }

        root.ok_or_else(|| SoundTouchError::Xml("document has no root element".to_string()))
    }

    fn from_start(start: &BytesStart) -> Result<Self> {
        let mut element = Self::new(String::from_utf8_lossy(start.name().as_ref()));
        for attr in start.attributes() {
            let attr = attr.map_err(|e| SoundTouchError::Xml(e.to_string()))?;
            let value = attr
                .unescape_value()
                .map_err(|e| SoundTouchError::Xml(e.to_string()))?;
            element.attributes.push((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                value.into_owned(),
            ));
        }
        Ok(element)
    }

    // ========== Builder ==========

    /// Add or replace an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    /// Set the text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Append a child element
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    // ========== Accessors ==========

    /// Element name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of an attribute, if present
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the attribute is present (even if empty)
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|(n, _)| n == name)
    }

    /// Whether every listed attribute is present
    pub fn has_attributes(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.has_attribute(name))
    }

    /// Own text content; empty text is reported as absent
    pub fn text(&self) -> Option<&str> {
        if self.text.is_empty() {
            None
        } else {
            Some(&self.text)
        }
    }

    /// Text content of the first child with the given name
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(|c| c.text())
    }

    /// First direct child with the given name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given name, in document order
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    // ========== Serialization ==========

    /// Render the element (and its subtree) as XML text
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write_into(&mut writer)?;
        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| SoundTouchError::Xml(e.to_string()))
    }

    fn write_into(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (name, value) in &self.attributes {
            start.push_attribute((name.as_str(), value.as_str()));
        }

        if self.text.is_empty() && self.children.is_empty() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(|e| SoundTouchError::Xml(e.to_string()));
        }

        writer
            .write_event(Event::Start(start))
            .map_err(|e| SoundTouchError::Xml(e.to_string()))?;
        if !self.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(|e| SoundTouchError::Xml(e.to_string()))?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(|e| SoundTouchError::Xml(e.to_string()))
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(SoundTouchError::Xml("multiple root elements".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW_PLAYING: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<nowPlaying deviceID="A0F6FD1C2B3E" source="SPOTIFY" sourceAccount="user">
  <ContentItem source="SPOTIFY" location="spotify:track:1" isPresetable="true">
    <itemName>Rock &amp; Roll</itemName>
  </ContentItem>
  <track>Song</track>
  <artist></artist>
  <playStatus>PLAY_STATE</playStatus>
</nowPlaying>"#;

    #[test]
    fn parses_attributes_text_and_children() {
        let root = XmlElement::parse(NOW_PLAYING.as_bytes()).unwrap();

        assert_eq!(root.name(), "nowPlaying");
        assert_eq!(root.attribute("source"), Some("SPOTIFY"));
        assert!(root.has_attributes(&["deviceID", "sourceAccount"]));
        assert!(!root.has_attribute("missing"));
        assert_eq!(root.child_text("playStatus"), Some("PLAY_STATE"));

        let item = root.child("ContentItem").unwrap();
        assert_eq!(item.child_text("itemName"), Some("Rock & Roll"));
    }

    #[test]
    fn empty_text_is_absent() {
        let root = XmlElement::parse(NOW_PLAYING.as_bytes()).unwrap();
        assert_eq!(root.child_text("artist"), None);
        assert_eq!(root.child_text("album"), None);
    }

    #[test]
    fn children_lists_direct_matches_in_order() {
        let xml = r#"<presets><preset id="1"/><other/><preset id="2"><preset id="nested"/></preset></presets>"#;
        let root = XmlElement::parse(xml.as_bytes()).unwrap();

        let ids: Vec<_> = root
            .children("preset")
            .filter_map(|p| p.attribute("id"))
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(XmlElement::parse(b"<volume><actualvolume>3</volume>").is_err());
        assert!(XmlElement::parse(b"<volume>").is_err());
        assert!(XmlElement::parse(b"").is_err());
    }

    #[test]
    fn renders_escaped_xml() {
        let element = XmlElement::new("key")
            .with_attribute("state", "press")
            .with_attribute("sender", "Gabbo")
            .with_text("POWER");
        assert_eq!(
            element.to_xml().unwrap(),
            r#"<key state="press" sender="Gabbo">POWER</key>"#
        );

        let nested = XmlElement::new("ContentItem")
            .with_attribute("source", "A&B")
            .with_child(XmlElement::new("itemName").with_text("<fm>"));
        assert_eq!(
            nested.to_xml().unwrap(),
            r#"<ContentItem source="A&amp;B"><itemName>&lt;fm&gt;</itemName></ContentItem>"#
        );
    }

    #[test]
    fn with_attribute_replaces_existing_value() {
        let element = XmlElement::new("zone")
            .with_attribute("master", "a")
            .with_attribute("master", "b");
        assert_eq!(element.attribute("master"), Some("b"));
        assert_eq!(element.to_xml().unwrap(), r#"<zone master="b"/>"#);
    }
}
