//! # docreg ledger
//!
//! The boundary between the registry and its external collaborators.
//!
//! - [`Transaction`] - A signed register/update record, content-addressed by Blake3
//! - [`TransactionLabel`] - Opaque (group, label) annotation for later lookup
//! - [`Ledger`] - Orders transactions per document and arbitrates races
//! - [`IdentityDirectory`] - Maps users to their public keys
//!
//! [`MemoryLedger`] and [`MemoryDirectory`] implement both traits in memory.

pub mod error;
pub mod label;
pub mod memory;
pub mod traits;
pub mod transaction;

pub use error::{LedgerError, Result};
pub use label::TransactionLabel;
pub use memory::{MemoryDirectory, MemoryLedger};
pub use traits::{IdentityDirectory, Ledger};
pub use transaction::{
    Transaction, TransactionBuilder, TransactionHeader, TransactionKind, TransactionSignature,
    TRANSACTION_VERSION,
};
