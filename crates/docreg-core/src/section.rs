//! Section trees and the redaction-tolerant digest.
//!
//! A document body is an ordered list of [`SectionNode`]s. Every node has a
//! SHA-256 digest:
//!
//! - a [`Leaf`] hashes its own canonical serialization,
//! - a [`Container`] hashes the concatenation of its children's digests,
//! - a [`SectionNode::Digest`] placeholder *is* its digest.
//!
//! Because a container only ever sees its children's digests, any subtree
//! can be swapped for a placeholder carrying that subtree's digest without
//! changing any ancestor digest. That is what makes redaction verifiable.

use std::collections::BTreeMap;

use crate::crypto::Sha256Digest;
use crate::error::MarkupError;
use crate::markup::{escape_attribute, escape_text, SECTION_TAGS};

/// Maximum nesting depth of a section tree, counting top-level sections as 1.
pub const MAX_SECTION_DEPTH: usize = 32;

/// Attribute marking a section element as a container.
pub const CONTAINER_ATTRIBUTE: &str = "container";

/// Element attributes, kept sorted by name.
pub type Attributes = BTreeMap<String, String>;

/// A text-bearing section.
///
/// The tag is always one of the section tags and the leaf never carries
/// `container="true"`, so its markup reparses as the same leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    tag: String,
    attributes: Attributes,
    text: String,
}

impl Leaf {
    /// A leaf with no attributes.
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Result<Self, MarkupError> {
        Self::with_attributes(tag, Attributes::new(), text)
    }

    pub fn with_attributes(
        tag: impl Into<String>,
        attributes: Attributes,
        text: impl Into<String>,
    ) -> Result<Self, MarkupError> {
        let tag = check_section_tag(tag.into())?;
        if is_marked_container(&attributes) {
            return Err(MarkupError::MarkedLeaf(tag));
        }
        Ok(Self {
            tag,
            attributes,
            text: text.into(),
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Canonical serialization of this single element.
    ///
    /// `<tag a="v">text</tag>` with attributes in name order, or `<tag />`
    /// when the text is empty. Surrounding whitespace and siblings never
    /// contribute.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = String::with_capacity(self.tag.len() * 2 + self.text.len() + 8);
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attribute(value));
            out.push('"');
        }
        if self.text.is_empty() {
            out.push_str(" />");
        } else {
            out.push('>');
            out.push_str(&escape_text(&self.text));
            out.push_str("</");
            out.push_str(&self.tag);
            out.push('>');
        }
        out.into_bytes()
    }

    /// SHA-256 of [`Leaf::canonical_bytes`].
    pub fn digest(&self) -> Sha256Digest {
        Sha256Digest::hash(&self.canonical_bytes())
    }
}

/// A section holding an ordered, non-empty list of child sections.
///
/// Its attributes always include `container="true"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    tag: String,
    attributes: Attributes,
    children: Vec<SectionNode>,
}

impl Container {
    /// Create a container, adding the `container="true"` marker to
    /// `attributes`. Fails if `children` is empty or `tag` is not a
    /// section tag.
    pub fn new(
        tag: impl Into<String>,
        mut attributes: Attributes,
        children: Vec<SectionNode>,
    ) -> Result<Self, MarkupError> {
        let tag = check_section_tag(tag.into())?;
        if children.is_empty() {
            return Err(MarkupError::EmptyContainer(tag));
        }
        attributes.insert(CONTAINER_ATTRIBUTE.to_string(), "true".to_string());
        Ok(Self {
            tag,
            attributes,
            children,
        })
    }

    /// A `sec` container with no other attributes.
    pub fn section(children: Vec<SectionNode>) -> Result<Self, MarkupError> {
        Self::new("sec", Attributes::new(), children)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn children(&self) -> &[SectionNode] {
        &self.children
    }

    /// Mutable access to the children. The slice cannot shrink, so the
    /// non-empty invariant holds.
    pub fn children_mut(&mut self) -> &mut [SectionNode] {
        &mut self.children
    }

    /// SHA-256 of the concatenated child digests.
    pub fn digest(&self) -> Sha256Digest {
        let digests = child_digests(&self.children);
        Sha256Digest::hash_concat(digests.iter().map(|d| d.as_bytes().as_slice()))
    }
}

/// One node of a section tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionNode {
    Leaf(Leaf),
    Container(Container),
    /// Precomputed digest standing in for a redacted subtree.
    Digest(Sha256Digest),
}

impl SectionNode {
    /// Convenience constructor for a `sec` leaf.
    pub fn leaf(text: impl Into<String>) -> Self {
        Self::Leaf(Leaf {
            tag: "sec".to_string(),
            attributes: Attributes::new(),
            text: text.into(),
        })
    }

    pub fn digest(&self) -> Sha256Digest {
        match self {
            SectionNode::Leaf(leaf) => leaf.digest(),
            SectionNode::Container(container) => container.digest(),
            SectionNode::Digest(digest) => *digest,
        }
    }

    /// The placeholder that can replace this node without changing any
    /// ancestor digest.
    pub fn redacted(&self) -> SectionNode {
        SectionNode::Digest(self.digest())
    }

    /// Nesting depth of this subtree (a leaf or placeholder is 1).
    pub fn depth(&self) -> usize {
        match self {
            SectionNode::Container(container) => {
                1 + container
                    .children
                    .iter()
                    .map(SectionNode::depth)
                    .max()
                    .unwrap_or(0)
            }
            _ => 1,
        }
    }

    pub fn is_redacted(&self) -> bool {
        matches!(self, SectionNode::Digest(_))
    }

    /// Number of placeholders anywhere in this subtree.
    pub fn redacted_count(&self) -> usize {
        match self {
            SectionNode::Digest(_) => 1,
            SectionNode::Leaf(_) => 0,
            SectionNode::Container(container) => container
                .children
                .iter()
                .map(SectionNode::redacted_count)
                .sum(),
        }
    }

    /// Children of a container; empty for leaves and placeholders.
    pub fn children(&self) -> &[SectionNode] {
        match self {
            SectionNode::Container(container) => container.children(),
            _ => &[],
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            SectionNode::Leaf(leaf) => Some(&leaf.text),
            _ => None,
        }
    }
}

/// Whether `attributes` mark an element as a container.
pub(crate) fn is_marked_container(attributes: &Attributes) -> bool {
    attributes
        .get(CONTAINER_ATTRIBUTE)
        .is_some_and(|v| v == "true")
}

fn check_section_tag(tag: String) -> Result<String, MarkupError> {
    if SECTION_TAGS.contains(&tag.as_str()) {
        Ok(tag)
    } else {
        Err(MarkupError::UnknownElement(tag))
    }
}

/// Digests of a sibling list, in document order.
pub fn child_digests(nodes: &[SectionNode]) -> Vec<Sha256Digest> {
    nodes.iter().map(SectionNode::digest).collect()
}

/// Check the depth bound over a list of top-level sections.
pub fn check_depth(nodes: &[SectionNode]) -> Result<(), MarkupError> {
    if nodes.iter().any(|n| n.depth() > MAX_SECTION_DEPTH) {
        return Err(MarkupError::TooDeep(MAX_SECTION_DEPTH));
    }
    Ok(())
}
