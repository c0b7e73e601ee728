//! # docreg
//!
//! A registry for redactable documents. Each registered document has an
//! entry holding its owner, its identity digest and its spec; every change
//! to an entry is a signed transaction accepted by a ledger.
//!
//! ## Key Concepts
//!
//! - **Identity digest**: SHA-256 of the document file. Redacting sections
//!   does not change it, so a redacted copy still verifies.
//! - **Spec**: Description, expiry and whether further updates are allowed.
//! - **Ledger**: Orders transactions per document. Of two updates built on
//!   the same head, exactly one is accepted.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docreg::{Registry, RegistryConfig};
//! use docreg::core::{Document, DocumentId, DocumentSpec, SectionNode};
//! use docreg::ledger::{IdentityDirectory, MemoryDirectory, MemoryLedger};
//! use docreg::store::MemoryEntryStore;
//!
//! async fn example() -> docreg::Result<()> {
//!     let directory = Arc::new(MemoryDirectory::new());
//!     let (registry_id, _registry_keys) = directory.create_user_id(1).await?;
//!     let (owner, owner_keys) = directory.create_user_id(1).await?;
//!
//!     let ledger = MemoryLedger::new();
//!     let registry = Registry::new(
//!         RegistryConfig::new(registry_id),
//!         ledger.connect(),
//!         directory,
//!         MemoryEntryStore::new(),
//!     );
//!
//!     let document = Document::new(vec![SectionNode::leaf("Today,")])?
//!         .with_id(DocumentId::random());
//!     registry
//!         .register(&owner, &document, DocumentSpec::default(), &owner_keys[0], None)
//!         .await?;
//!
//!     registry.close()
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `docreg::core` - Sections, documents, digests and specs
//! - `docreg::ledger` - Transactions, labels, ledger and directory
//! - `docreg::store` - Entry storage, in memory and SQLite

pub mod config;
pub mod error;
pub mod record;
pub mod registry;

// Re-export component crates
pub use docreg_core as core;
pub use docreg_ledger as ledger;
pub use docreg_store as store;

pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use record::{RegistryRecord, SPEC_OFFSET};
pub use registry::{Registry, Verification};

// Commonly used types
pub use docreg_core::{
    Document, DocumentId, DocumentSpec, EntryVersion, Keypair, RegistryEntry, SectionNode,
    Sha256Digest, UserId,
};
pub use docreg_ledger::{Transaction, TransactionLabel};
