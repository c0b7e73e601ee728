//! # docreg core
//!
//! Pure primitives for the document registry: section trees, redaction-tolerant
//! digests, signed envelopes and document specs.
//!
//! This crate performs no I/O. Everything here is deterministic computation
//! over documents and metadata records.
//!
//! ## Key Types
//!
//! - [`SectionNode`] - Leaf, container, or digest placeholder
//! - [`Document`] - Root attributes plus top-level sections
//! - [`SignedEnvelope`] - Digest, public key, algorithm code and signature
//! - [`DocumentSpec`] - Description, expiry and update policy
//! - [`RegistryEntry`] - Current state of a registered document
//!
//! ## Digests
//!
//! A leaf hashes its canonical serialization, a container hashes its
//! children's digests, and a placeholder is its own digest. Replacing any
//! subtree by its placeholder leaves every ancestor digest unchanged. See
//! [`section`].

pub mod canonical;
pub mod crypto;
pub mod document;
pub mod entry;
pub mod envelope;
pub mod error;
pub mod markup;
pub mod section;
pub mod spec;
pub mod types;

pub use canonical::encode_canonical;
pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair, Sha256Digest};
pub use document::Document;
pub use entry::{EntryVersion, RegistryEntry};
pub use envelope::{KeyType, SignedEnvelope};
pub use error::{CoreError, DocumentError, MarkupError, ValidationError};
pub use section::{Attributes, Container, Leaf, SectionNode, MAX_SECTION_DEPTH};
pub use spec::{Description, DescriptionValue, DocumentSpec, DocumentSpecBuilder};
pub use types::{DocumentId, LabelGroupId, LabelId, TransactionId, UserId, ID_LENGTH};
