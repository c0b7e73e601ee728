//! Documents: an identifier plus a root of top-level sections.

use crate::crypto::{Keypair, Sha256Digest};
use crate::envelope::{KeyType, SignedEnvelope, ALGO_ATTRIBUTE, PUBKEY_ATTRIBUTE, SIG_ATTRIBUTE};
use crate::error::{DocumentError, MarkupError};
use crate::markup;
use crate::section::{check_depth, Attributes, SectionNode};
use crate::types::DocumentId;

/// A section tree with optional identifier and root attributes.
///
/// Sections are addressed by paths: `[i]` is the `i`th top-level section,
/// `[i, j]` its `j`th child, and so on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: Option<DocumentId>,
    attributes: Attributes,
    sections: Vec<SectionNode>,
}

impl Document {
    /// Build a document from top-level sections. At least one is required.
    pub fn new(sections: Vec<SectionNode>) -> Result<Self, DocumentError> {
        if sections.is_empty() {
            return Err(MarkupError::EmptyContainer(markup::ROOT_TAG.to_string()).into());
        }
        check_depth(&sections)?;
        Ok(Self {
            id: None,
            attributes: Attributes::new(),
            sections,
        })
    }

    /// Parse the markup dialect. The identifier is left unset.
    pub fn from_markup(input: &str) -> Result<Self, DocumentError> {
        let parsed = markup::parse(input)?;
        Ok(Self {
            id: None,
            attributes: parsed.attributes,
            sections: parsed.sections,
        })
    }

    pub fn to_markup(&self) -> String {
        markup::write(&self.attributes, &self.sections)
    }

    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn set_document_id(&mut self, id: DocumentId) {
        self.id = Some(id);
    }

    pub fn document_id(&self) -> Option<DocumentId> {
        self.id
    }

    /// The identifier, or [`DocumentError::MissingDocumentId`].
    pub fn require_id(&self) -> Result<DocumentId, DocumentError> {
        self.id.ok_or(DocumentError::MissingDocumentId)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    pub fn sections(&self) -> &[SectionNode] {
        &self.sections
    }

    pub fn section(&self, path: &[usize]) -> Option<&SectionNode> {
        node_at(&self.sections, path)
    }

    /// Replace the text of the leaf at `path`.
    pub fn set_text(&mut self, path: &[usize], text: impl Into<String>) -> Result<(), DocumentError> {
        match node_at_mut(&mut self.sections, path) {
            Some(SectionNode::Leaf(leaf)) => {
                leaf.set_text(text);
                Ok(())
            }
            Some(_) => Err(DocumentError::NotALeaf(path.to_vec())),
            None => Err(DocumentError::NoSuchSection(path.to_vec())),
        }
    }

    /// Replace the subtree at `path` with its digest placeholder.
    ///
    /// Returns the placeholder digest. The document's digest is unchanged.
    pub fn redact(&mut self, path: &[usize]) -> Result<Sha256Digest, DocumentError> {
        let node = node_at_mut(&mut self.sections, path)
            .ok_or_else(|| DocumentError::NoSuchSection(path.to_vec()))?;
        let digest = node.digest();
        *node = SectionNode::Digest(digest);
        Ok(digest)
    }

    /// Concatenated digests of the top-level sections.
    pub fn unsigned_file(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.sections.len() * Sha256Digest::LEN);
        for section in &self.sections {
            out.extend_from_slice(section.digest().as_bytes());
        }
        out
    }

    /// SHA-256 of the unsigned file. Ignores any signature attributes.
    pub fn content_digest(&self) -> Sha256Digest {
        Sha256Digest::hash(&self.unsigned_file())
    }

    /// The file bytes: the signed envelope when the root carries `sig`,
    /// otherwise the unsigned file.
    pub fn file(&self) -> Result<Vec<u8>, DocumentError> {
        let unsigned = self.unsigned_file();
        let digest = Sha256Digest::hash(&unsigned);
        match SignedEnvelope::from_attributes(digest, &self.attributes)? {
            Some(envelope) => Ok(envelope.to_bytes()),
            None => Ok(unsigned),
        }
    }

    /// Identity digest: SHA-256 of [`Document::file`].
    pub fn digest(&self) -> Result<Sha256Digest, DocumentError> {
        Ok(Sha256Digest::hash(&self.file()?))
    }

    pub fn is_signed(&self) -> bool {
        self.attributes.contains_key(SIG_ATTRIBUTE)
    }

    /// Sign the content digest with an Ed25519 key and record the
    /// signature attributes on the root.
    pub fn sign(&mut self, keypair: &Keypair) {
        let signature = keypair.sign(self.content_digest().as_bytes());
        self.set_attribute(SIG_ATTRIBUTE, signature.to_hex());
        self.set_attribute(PUBKEY_ATTRIBUTE, keypair.public_key().to_hex());
        self.set_attribute(ALGO_ATTRIBUTE, KeyType::Ed25519.name());
    }

    /// Number of redacted subtrees.
    pub fn redacted_count(&self) -> usize {
        self.sections.iter().map(SectionNode::redacted_count).sum()
    }
}

fn node_at<'a>(nodes: &'a [SectionNode], path: &[usize]) -> Option<&'a SectionNode> {
    let (first, rest) = path.split_first()?;
    let node = nodes.get(*first)?;
    if rest.is_empty() {
        Some(node)
    } else {
        node_at(node.children(), rest)
    }
}

fn node_at_mut<'a>(nodes: &'a mut [SectionNode], path: &[usize]) -> Option<&'a mut SectionNode> {
    let (first, rest) = path.split_first()?;
    let node = nodes.get_mut(*first)?;
    if rest.is_empty() {
        return Some(node);
    }
    match node {
        SectionNode::Container(container) => node_at_mut(container.children_mut(), rest),
        _ => None,
    }
}
