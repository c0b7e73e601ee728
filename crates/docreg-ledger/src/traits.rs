//! Collaborator traits: the ledger that orders transactions and the
//! directory that knows which keys belong to which users.

use async_trait::async_trait;
use docreg_core::{DocumentId, Ed25519PublicKey, Keypair, TransactionId, UserId};

use crate::error::{LedgerError, Result};
use crate::transaction::Transaction;

/// A connection to the transaction ledger.
///
/// The ledger is the sole arbiter of ordering: a transaction is accepted
/// only if its `prev` equals the document's current head, so of two racing
/// updates built on the same head exactly one wins.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submit a signed transaction and wait for acceptance.
    ///
    /// # Errors
    /// - `Conflict` if `prev` is not the current head.
    /// - `Rejected` for unsigned, badly signed or duplicate transactions.
    /// - `Closed` after [`Ledger::close`].
    async fn submit(&self, tx: &Transaction) -> Result<TransactionId>;

    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>>;

    /// Latest accepted transaction for a document.
    async fn head(&self, document_id: &DocumentId) -> Result<Option<TransactionId>>;

    /// Release this connection. Later calls on it fail with `Closed`.
    fn close(&self) -> Result<()>;
}

/// The identity-and-key directory.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Issue a new user with `num_keys` fresh keypairs.
    ///
    /// Custody of the returned keypairs passes to the caller.
    async fn create_user_id(&self, num_keys: usize) -> Result<(UserId, Vec<Keypair>)>;

    /// Public keys currently bound to `user`.
    async fn public_keys(&self, user: &UserId) -> Result<Vec<Ed25519PublicKey>>;

    async fn is_known(&self, user: &UserId) -> Result<bool>;

    /// Whether `key` is one of `user`'s keys. Unknown users never authenticate.
    async fn authenticates(&self, user: &UserId, key: &Ed25519PublicKey) -> Result<bool> {
        match self.public_keys(user).await {
            Ok(keys) => Ok(keys.contains(key)),
            Err(LedgerError::UnknownUser(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
