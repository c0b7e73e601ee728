//! Error types for the registry core.

use thiserror::Error;

/// Low-level cryptographic and encoding errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Errors raised while parsing the section markup dialect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unexpected character {found:?} at byte {position}")]
    UnexpectedChar { position: usize, found: char },

    #[error("mismatched closing tag at byte {position}: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("unknown element <{0}>")]
    UnknownElement(String),

    #[error("unsupported markup construct at byte {0}")]
    Unsupported(usize),

    #[error("invalid entity reference &{0};")]
    InvalidEntity(String),

    #[error("duplicate attribute {0:?}")]
    DuplicateAttribute(String),

    #[error("container <{0}> has no children")]
    EmptyContainer(String),

    #[error("leaf <{0}> contains child elements but is not marked container=\"true\"")]
    UnmarkedContainer(String),

    #[error("leaf <{0}> is marked container=\"true\"")]
    MarkedLeaf(String),

    #[error("digest placeholder is not 32 bytes of hex: {0:?}")]
    InvalidDigest(String),

    #[error("trailing content after root element at byte {0}")]
    TrailingContent(usize),

    #[error("section nesting exceeds maximum depth of {0}")]
    TooDeep(usize),
}

/// Errors raised by document operations (file assembly, edits, redaction).
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("markup error: {0}")]
    Markup(#[from] MarkupError),

    /// The root carries a signature but the envelope cannot be assembled.
    #[error("structural error: {0}")]
    Structural(String),

    #[error("unknown signature algorithm: {0:?}")]
    UnknownAlgorithm(String),

    #[error("no section at path {0:?}")]
    NoSuchSection(Vec<usize>),

    #[error("section at path {0:?} is not a leaf")]
    NotALeaf(Vec<usize>),

    #[error("document has no identifier")]
    MissingDocumentId,
}

/// Validation errors for [`DocumentSpec`](crate::spec::DocumentSpec) construction and decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("description must be text, bytes, or a record of text/bytes values: {0}")]
    InvalidDescription(String),

    #[error("expire_at must be a non-negative integer: {0}")]
    InvalidExpireAt(String),

    #[error("option_updatable must be a boolean: {0}")]
    InvalidUpdatable(String),

    #[error("unknown spec field {0:?}")]
    UnknownField(String),

    #[error("malformed spec record: {0}")]
    Malformed(String),

    #[error("spec record at offset {0} is not canonically encoded")]
    NonCanonical(usize),
}
