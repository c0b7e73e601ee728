//! EntryStore trait: the local index of registry entries.
//!
//! The ledger is authoritative; the store remembers what this registry has
//! seen accepted so reads need no ledger round trip.

use async_trait::async_trait;
use docreg_core::{DocumentId, EntryVersion, RegistryEntry, TransactionId};

use crate::error::Result;

/// Outcome of a compare-and-swap write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutResult {
    /// The entry was written and its version recorded.
    Applied,
    /// The stored head did not match the expected head. Nothing was written.
    Stale {
        /// The head currently stored (None if the entry is absent).
        current: Option<TransactionId>,
    },
}

/// Async interface for entry persistence.
///
/// Writes are compare-and-swap on the head transaction id, so two writers
/// advancing the same entry from the same state cannot both succeed.
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn get_entry(&self, document_id: &DocumentId) -> Result<Option<RegistryEntry>>;

    /// Write `entry` if the stored head equals `expected_head`.
    ///
    /// `expected_head = None` means the entry must not exist yet. On success
    /// the entry's version record is appended to its history.
    async fn put_entry(
        &self,
        entry: &RegistryEntry,
        expected_head: Option<TransactionId>,
    ) -> Result<PutResult>;

    /// Version chain of a document, oldest first. Empty if unknown.
    async fn history(&self, document_id: &DocumentId) -> Result<Vec<EntryVersion>>;

    /// All documents with an entry.
    async fn list_documents(&self) -> Result<Vec<DocumentId>>;
}
