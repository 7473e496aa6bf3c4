//! Output document: the rebuilt, publishable feed.
//!
//! A document is always built from scratch out of a full key set and
//! rendered as RSS 2.0. Rendering is a pure function of the document, and
//! the document ordering is a pure function of the keys, so rebuilding from
//! an unchanged key set yields byte-identical output.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::entry::Entry;

/// Channel-level metadata of the output feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMeta {
    pub title: String,
    pub description: String,
    pub link: Option<String>,
}

impl ChannelMeta {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            link: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// One decoded entry together with the store key it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentItem {
    pub key: String,
    pub entry: Entry,
}

/// A fully materialized feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    meta: ChannelMeta,
    items: Vec<DocumentItem>,
}

impl OutputDocument {
    /// Build a document from decoded items.
    ///
    /// Items are ordered by key, newest first. Input order does not matter.
    pub fn build(meta: ChannelMeta, items: impl IntoIterator<Item = DocumentItem>) -> Self {
        let mut items: Vec<DocumentItem> = items.into_iter().collect();
        items.sort_by(|a, b| b.key.cmp(&a.key));
        items.dedup_by(|a, b| a.key == b.key);
        Self { meta, items }
    }

    pub fn meta(&self) -> &ChannelMeta {
        &self.meta
    }

    pub fn items(&self) -> &[DocumentItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Render as RSS 2.0 XML.
    pub fn to_rss(&self) -> String {
        let mut xml = XmlBuilder::new();
        xml.header().open_attr("rss", &[("version", "2.0")]).open("channel");
        xml.elem("title", &self.meta.title);
        if let Some(link) = &self.meta.link {
            xml.elem("link", link);
        }
        xml.elem("description", &self.meta.description);

        for item in &self.items {
            xml.open("item");
            xml.elem("title", &item.entry.title);
            if !item.entry.link.is_empty() {
                xml.elem("link", &item.entry.link);
            }
            xml.elem("description", &item.entry.description);
            if let Some(published) = item.entry.published() {
                // RFC 2822 only covers four-digit years.
                if (0..=9999).contains(&published.year()) {
                    xml.elem("pubDate", &published.to_rfc2822());
                }
            }
            xml.elem_attr("guid", &[("isPermaLink", "false")], &item.key);
            xml.close("item");
        }

        xml.close("channel").close("rss");
        xml.finish()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_rss().into_bytes()
    }
}

/// Minimal XML writer; one element per line.
struct XmlBuilder {
    buf: String,
}

impl XmlBuilder {
    fn new() -> Self {
        Self { buf: String::new() }
    }

    fn header(&mut self) -> &mut Self {
        self.buf.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self
    }

    fn open(&mut self, tag: &str) -> &mut Self {
        self.open_attr(tag, &[])
    }

    fn open_attr(&mut self, tag: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.start_tag(tag, attrs);
        self.buf.push('\n');
        self
    }

    fn close(&mut self, tag: &str) -> &mut Self {
        self.buf.push_str("</");
        self.buf.push_str(tag);
        self.buf.push_str(">\n");
        self
    }

    fn elem(&mut self, tag: &str, value: &str) -> &mut Self {
        self.elem_attr(tag, &[], value)
    }

    fn elem_attr(&mut self, tag: &str, attrs: &[(&str, &str)], value: &str) -> &mut Self {
        self.start_tag(tag, attrs);
        self.buf.push_str(&escape(value));
        self.close(tag)
    }

    fn start_tag(&mut self, tag: &str, attrs: &[(&str, &str)]) {
        self.buf.push('<');
        self.buf.push_str(tag);
        for (name, value) in attrs {
            self.buf.push(' ');
            self.buf.push_str(name);
            self.buf.push_str("=\"");
            self.buf.push_str(&escape(value));
            self.buf.push('"');
        }
        self.buf.push('>');
    }

    fn finish(self) -> String {
        self.buf
    }
}

fn escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            c if !is_xml_char(c) => {}
            _ => result.push(c),
        }
    }
    result
}

/// Characters allowed in an XML 1.0 document.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{fffd}' | '\u{10000}'..='\u{10ffff}')
}
