//! Registry entries: the current state of one registered document.

use crate::crypto::Sha256Digest;
use crate::spec::DocumentSpec;
use crate::types::{DocumentId, TransactionId, UserId};

/// Current state of a registered document.
///
/// Created by a register transaction and advanced by each accepted update.
/// Earlier states are reachable through the ledger's `prev` links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub document_id: DocumentId,
    pub owner: UserId,
    pub digest: Sha256Digest,
    pub spec: DocumentSpec,
    /// Latest accepted transaction for this document.
    pub head: TransactionId,
    /// 1 after registration, incremented per update.
    pub version: u64,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Unix milliseconds.
    pub updated_at: i64,
}

impl RegistryEntry {
    /// State right after registration.
    pub fn registered(
        document_id: DocumentId,
        owner: UserId,
        digest: Sha256Digest,
        spec: DocumentSpec,
        head: TransactionId,
        timestamp: i64,
    ) -> Self {
        Self {
            document_id,
            owner,
            digest,
            spec,
            head,
            version: 1,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// The state that follows an accepted update.
    pub fn advanced(
        &self,
        owner: UserId,
        digest: Sha256Digest,
        spec: DocumentSpec,
        head: TransactionId,
        timestamp: i64,
    ) -> Self {
        Self {
            document_id: self.document_id,
            owner,
            digest,
            spec,
            head,
            version: self.version + 1,
            created_at: self.created_at,
            updated_at: timestamp,
        }
    }

    pub fn is_updatable(&self) -> bool {
        self.spec.option_updatable()
    }

    pub fn version_record(&self) -> EntryVersion {
        EntryVersion {
            version: self.version,
            transaction_id: self.head,
            digest: self.digest,
            owner: self.owner,
            timestamp: self.updated_at,
        }
    }
}

/// One step of a document's version chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryVersion {
    pub version: u64,
    pub transaction_id: TransactionId,
    pub digest: Sha256Digest,
    pub owner: UserId,
    pub timestamp: i64,
}
