//! Error types for the registry.

use docreg_core::{DocumentError, DocumentId, UserId, ValidationError};
use docreg_ledger::LedgerError;
use docreg_store::StoreError;
use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The document could not be parsed, edited or assembled into a file.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// A spec or payload record failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Reported by the ledger or directory, unmodified.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A signing key does not authenticate for the role it was used in.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// The current spec forbids further updates.
    #[error("document {0:?} is not updatable")]
    ImmutableSpec(DocumentId),

    #[error("document not found: {0:?}")]
    NotFound(DocumentId),

    #[error("document already registered: {0:?}")]
    AlreadyRegistered(DocumentId),

    /// The directory does not know this user.
    #[error("unknown user: {0:?}")]
    UnknownUser(UserId),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
