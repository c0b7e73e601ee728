//! Error types for the ledger and directory boundary.

use docreg_core::{DocumentId, TransactionId};
use thiserror::Error;

/// Errors reported by a [`Ledger`](crate::Ledger) or
/// [`IdentityDirectory`](crate::IdentityDirectory).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The ledger refused the transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The transaction does not extend the document's current head.
    #[error("conflict on document {document_id:?}: transaction extends {claimed:?} but head is {head:?}")]
    Conflict {
        document_id: DocumentId,
        claimed: Option<TransactionId>,
        head: Option<TransactionId>,
    },

    /// The connection was already released.
    #[error("ledger connection closed")]
    Closed,

    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// Failure reaching the collaborator.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for ledger and directory operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
