//! The section markup dialect.
//!
//! ```text
//! <doc sig="…" pubkey="…" algo="…">
//!   <sec>leaf text</sec>
//!   <sec container="true">
//!     <w>nested leaf</w>
//!     <digest>64 hex chars</digest>
//!   </sec>
//! </doc>
//! ```
//!
//! This is deliberately not a general XML reader. It accepts elements,
//! attributes, character data, the five predefined entities and numeric
//! character references, an optional prolog and comments. DTDs, CDATA and
//! processing instructions inside the root are rejected.

use std::borrow::Cow;

use crate::crypto::Sha256Digest;
use crate::error::MarkupError;
use crate::section::{
    is_marked_container, Attributes, Container, Leaf, SectionNode, MAX_SECTION_DEPTH,
};

/// Tag of the root element.
pub const ROOT_TAG: &str = "doc";
/// Tag of a redaction placeholder.
pub const DIGEST_TAG: &str = "digest";
/// Tags that may carry section content.
pub const SECTION_TAGS: [&str; 2] = ["sec", "w"];

/// Parsed root of a markup document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMarkup {
    pub attributes: Attributes,
    pub sections: Vec<SectionNode>,
}

/// Parse markup text into root attributes and top-level sections.
///
/// Line endings are normalized to `\n` first, so `\r\n` and `\r` in the
/// source never reach leaf text or attribute values.
pub fn parse(input: &str) -> Result<ParsedMarkup, MarkupError> {
    let input = normalize_line_endings(input);
    let mut parser = Parser::new(&input);
    parser.skip_prolog()?;
    let root = parser.element(0)?;
    parser.skip_misc()?;
    if parser.pos < parser.bytes.len() {
        return Err(MarkupError::TrailingContent(parser.pos));
    }

    if root.tag != ROOT_TAG {
        return Err(MarkupError::UnknownElement(root.tag));
    }
    if let Some(position) = root.text_position {
        return Err(MarkupError::Unsupported(position));
    }
    if root.children.is_empty() {
        return Err(MarkupError::EmptyContainer(root.tag));
    }
    let sections = root
        .children
        .into_iter()
        .map(into_section)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedMarkup {
        attributes: root.attributes,
        sections,
    })
}

/// Serialize a root and its sections back to markup, without indentation.
pub fn write(attributes: &Attributes, sections: &[SectionNode]) -> String {
    let mut out = String::new();
    out.push('<');
    out.push_str(ROOT_TAG);
    write_attributes(&mut out, attributes);
    out.push('>');
    for section in sections {
        write_section(&mut out, section);
    }
    out.push_str("</");
    out.push_str(ROOT_TAG);
    out.push('>');
    out
}

fn write_section(out: &mut String, node: &SectionNode) {
    match node {
        SectionNode::Leaf(leaf) => {
            out.push_str(&String::from_utf8_lossy(&leaf.canonical_bytes()));
        }
        SectionNode::Container(container) => {
            out.push('<');
            out.push_str(container.tag());
            write_attributes(out, container.attributes());
            out.push('>');
            for child in container.children() {
                write_section(out, child);
            }
            out.push_str("</");
            out.push_str(container.tag());
            out.push('>');
        }
        SectionNode::Digest(digest) => {
            out.push_str("<digest>");
            out.push_str(&digest.to_hex());
            out.push_str("</digest>");
        }
    }
}

fn write_attributes(out: &mut String, attributes: &Attributes) {
    for (name, value) in attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attribute(value));
        out.push('"');
    }
}

/// Escape character data.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value for a double-quoted attribute.
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#09;"),
            _ => out.push(c),
        }
    }
    out
}

/// A raw element before dialect rules are applied.
struct Element {
    tag: String,
    attributes: Attributes,
    text: String,
    /// Byte offset of the first non-whitespace character data, if any.
    text_position: Option<usize>,
    children: Vec<Element>,
}

fn into_section(element: Element) -> Result<SectionNode, MarkupError> {
    if element.tag == DIGEST_TAG {
        if !element.children.is_empty() {
            return Err(MarkupError::InvalidDigest(element.text));
        }
        let hex = element.text.trim();
        return Sha256Digest::from_hex(hex)
            .map(SectionNode::Digest)
            .map_err(|_| MarkupError::InvalidDigest(hex.to_string()));
    }
    if !SECTION_TAGS.contains(&element.tag.as_str()) {
        return Err(MarkupError::UnknownElement(element.tag));
    }
    if is_marked_container(&element.attributes) {
        if let Some(position) = element.text_position {
            return Err(MarkupError::Unsupported(position));
        }
        let children = element
            .children
            .into_iter()
            .map(into_section)
            .collect::<Result<Vec<_>, _>>()?;
        return Container::new(element.tag, element.attributes, children).map(SectionNode::Container);
    }

    if !element.children.is_empty() {
        return Err(MarkupError::UnmarkedContainer(element.tag));
    }
    Leaf::with_attributes(element.tag, element.attributes, element.text).map(SectionNode::Leaf)
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn unexpected(&self) -> MarkupError {
        match self.rest().chars().next() {
            Some(found) => MarkupError::UnexpectedChar {
                position: self.pos,
                found,
            },
            None => MarkupError::UnexpectedEof,
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), MarkupError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn skip_until(&mut self, terminator: &str) -> Result<(), MarkupError> {
        match self.rest().find(terminator) {
            Some(offset) => {
                self.pos += offset + terminator.len();
                Ok(())
            }
            None => Err(MarkupError::UnexpectedEof),
        }
    }

    /// Skip the XML declaration and any comments before the root.
    fn skip_prolog(&mut self) -> Result<(), MarkupError> {
        self.skip_whitespace();
        if self.rest().starts_with("<?xml") {
            self.skip_until("?>")?;
        }
        self.skip_misc()?;
        if self.rest().starts_with("<!") || self.rest().starts_with("<?") {
            return Err(MarkupError::Unsupported(self.pos));
        }
        Ok(())
    }

    /// Skip whitespace and comments.
    fn skip_misc(&mut self) -> Result<(), MarkupError> {
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("<!--") {
                self.skip_until("-->")?;
            } else {
                return Ok(());
            }
        }
    }

    fn name(&mut self) -> Result<String, MarkupError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            let ok = b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':');
            if !ok {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos || !self.bytes[start].is_ascii_alphabetic() && self.bytes[start] != b'_' {
            self.pos = start;
            return Err(self.unexpected());
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// Parse one element starting at `<`. `depth` counts enclosing elements.
    fn element(&mut self, depth: usize) -> Result<Element, MarkupError> {
        // The root sits above the section tree.
        if depth > MAX_SECTION_DEPTH {
            return Err(MarkupError::TooDeep(MAX_SECTION_DEPTH));
        }
        self.expect(b'<')?;
        let tag = self.name()?;
        let mut attributes = Attributes::new();

        loop {
            let before = self.pos;
            self.skip_whitespace();
            match self.peek() {
                Some(b'/') => {
                    self.pos += 1;
                    self.expect(b'>')?;
                    return Ok(Element {
                        tag,
                        attributes,
                        text: String::new(),
                        text_position: None,
                        children: Vec::new(),
                    });
                }
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(_) if self.pos == before => return Err(self.unexpected()),
                Some(_) => {
                    let name = self.name()?;
                    self.skip_whitespace();
                    self.expect(b'=')?;
                    self.skip_whitespace();
                    let value = self.attribute_value()?;
                    if attributes.insert(name.clone(), value).is_some() {
                        return Err(MarkupError::DuplicateAttribute(name));
                    }
                }
                None => return Err(MarkupError::UnexpectedEof),
            }
        }

        let mut text = String::new();
        let mut text_position = None;
        let mut children = Vec::new();

        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(MarkupError::UnexpectedEof);
            } else if rest.starts_with("</") {
                let position = self.pos;
                self.pos += 2;
                let found = self.name()?;
                self.skip_whitespace();
                self.expect(b'>')?;
                if found != tag {
                    return Err(MarkupError::MismatchedTag {
                        position,
                        expected: tag,
                        found,
                    });
                }
                break;
            } else if rest.starts_with("<!--") {
                self.skip_until("-->")?;
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                return Err(MarkupError::Unsupported(self.pos));
            } else if rest.starts_with('<') {
                children.push(self.element(depth + 1)?);
            } else {
                let start = self.pos;
                let end = rest.find('<').map_or(self.bytes.len(), |i| start + i);
                let raw = &self.input[start..end];
                if text_position.is_none() {
                    if let Some(offset) = raw.find(|c: char| !c.is_ascii_whitespace()) {
                        text_position = Some(start + offset);
                    }
                }
                text.push_str(&decode_entities(raw)?);
                self.pos = end;
            }
        }

        // Whitespace between child elements is formatting, not content.
        if !children.is_empty() && text_position.is_none() {
            text.clear();
        }

        Ok(Element {
            tag,
            attributes,
            text,
            text_position,
            children,
        })
    }

    fn attribute_value(&mut self) -> Result<String, MarkupError> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.unexpected()),
        };
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == quote {
                let raw = &self.input[start..self.pos];
                self.pos += 1;
                return decode_entities(&normalize_attribute_whitespace(raw));
            }
            if b == b'<' {
                return Err(self.unexpected());
            }
            self.pos += 1;
        }
        Err(MarkupError::UnexpectedEof)
    }
}

/// Map `\r\n` and lone `\r` to `\n`.
fn normalize_line_endings(input: &str) -> Cow<'_, str> {
    if !input.contains('\r') {
        return Cow::Borrowed(input);
    }
    Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Literal tabs and newlines in an attribute value read as spaces.
/// Character references still decode to the real character.
fn normalize_attribute_whitespace(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['\t', '\n', '\r']) {
        return Cow::Borrowed(raw);
    }
    Cow::Owned(raw.replace(['\t', '\n', '\r'], " "))
}

/// Decode predefined entities and numeric character references.
fn decode_entities(raw: &str) -> Result<String, MarkupError> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| MarkupError::InvalidEntity(after.chars().take(8).collect()))?;
        let name = &after[..semi];
        let decoded = match name {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => numeric_reference(name).ok_or_else(|| MarkupError::InvalidEntity(name.to_string()))?,
        };
        out.push(decoded);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn numeric_reference(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}
