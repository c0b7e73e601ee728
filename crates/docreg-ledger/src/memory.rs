//! In-memory ledger and directory.
//!
//! Used by tests and as the reference semantics for real collaborators.
//! Several [`MemoryLedger`] connections can share one ledger state, which is
//! how racing registries are modelled.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, warn};

use docreg_core::{DocumentId, Ed25519PublicKey, Keypair, LabelGroupId, TransactionId, UserId};

use crate::error::{LedgerError, Result};
use crate::traits::{IdentityDirectory, Ledger};
use crate::transaction::{Transaction, TransactionKind};

/// One connection to a shared in-memory ledger.
pub struct MemoryLedger {
    state: Arc<RwLock<LedgerState>>,
    open_connections: Arc<AtomicUsize>,
    closed: AtomicBool,
}

#[derive(Default)]
struct LedgerState {
    transactions: HashMap<TransactionId, Transaction>,
    heads: HashMap<DocumentId, TransactionId>,
    labels: HashMap<LabelGroupId, Vec<TransactionId>>,
    /// Acceptance order.
    log: Vec<TransactionId>,
}

impl MemoryLedger {
    /// A fresh ledger with one open connection.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState::default())),
            open_connections: Arc::new(AtomicUsize::new(1)),
            closed: AtomicBool::new(false),
        }
    }

    /// Open another connection to the same ledger state.
    pub fn connect(&self) -> Self {
        self.open_connections.fetch_add(1, Ordering::SeqCst);
        Self {
            state: Arc::clone(&self.state),
            open_connections: Arc::clone(&self.open_connections),
            closed: AtomicBool::new(false),
        }
    }

    /// Connections to this ledger state not yet closed.
    pub fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Accepted transactions carrying a label in `group`, in acceptance order.
    pub fn transactions_labeled(&self, group: &LabelGroupId) -> Result<Vec<Transaction>> {
        let state = self.read()?;
        Ok(state
            .labels
            .get(group)
            .into_iter()
            .flatten()
            .filter_map(|id| state.transactions.get(id).cloned())
            .collect())
    }

    /// Number of accepted transactions.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.log.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, LedgerState>> {
        self.state
            .read()
            .map_err(|_| LedgerError::Transport("ledger state lock poisoned".into()))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(LedgerError::Closed);
        }
        Ok(())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that need no ledger state.
fn validate(tx: &Transaction) -> Result<()> {
    if tx.signatures.is_empty() {
        return Err(LedgerError::Rejected("transaction is unsigned".into()));
    }
    if !tx.payload_matches_hash() {
        return Err(LedgerError::Rejected("payload hash mismatch".into()));
    }
    match (tx.kind(), tx.prev()) {
        (TransactionKind::Register, Some(_)) => {
            return Err(LedgerError::Rejected("register transaction has a prev".into()))
        }
        (TransactionKind::Update, None) => {
            return Err(LedgerError::Rejected("update transaction has no prev".into()))
        }
        _ => {}
    }
    tx.verify_signatures()
        .map_err(|e| LedgerError::Rejected(format!("signature check failed: {e}")))
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn submit(&self, tx: &Transaction) -> Result<TransactionId> {
        self.ensure_open()?;
        if let Err(e) = validate(tx) {
            warn!(document_id = ?tx.document_id(), error = %e, "transaction rejected");
            return Err(e);
        }

        let id = tx.compute_id();
        let document_id = *tx.document_id();

        let mut state = self
            .state
            .write()
            .map_err(|_| LedgerError::Transport("ledger state lock poisoned".into()))?;

        if state.transactions.contains_key(&id) {
            warn!(tx_id = ?id, "duplicate transaction rejected");
            return Err(LedgerError::Rejected(format!("duplicate transaction {id}")));
        }

        let head = state.heads.get(&document_id).copied();
        if tx.prev() != head {
            warn!(?document_id, claimed = ?tx.prev(), ?head, "stale head");
            return Err(LedgerError::Conflict {
                document_id,
                claimed: tx.prev(),
                head,
            });
        }

        for label in &tx.labels {
            state.labels.entry(*label.group_id()).or_default().push(id);
        }
        state.heads.insert(document_id, id);
        state.log.push(id);
        state.transactions.insert(id, tx.clone());

        debug!(tx_id = ?id, ?document_id, kind = ?tx.kind(), "transaction accepted");
        Ok(id)
    }

    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        self.ensure_open()?;
        Ok(self.read()?.transactions.get(id).cloned())
    }

    async fn head(&self, document_id: &DocumentId) -> Result<Option<TransactionId>> {
        self.ensure_open()?;
        Ok(self.read()?.heads.get(document_id).copied())
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(LedgerError::Closed);
        }
        self.open_connections.fetch_sub(1, Ordering::SeqCst);
        debug!("ledger connection closed");
        Ok(())
    }
}

/// In-memory identity directory.
#[derive(Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<UserId, Vec<Ed25519PublicKey>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `keys` to `user`, replacing any earlier binding.
    pub fn insert_user(&self, user: UserId, keys: Vec<Ed25519PublicKey>) -> Result<()> {
        self.users
            .write()
            .map_err(|_| LedgerError::Transport("directory lock poisoned".into()))?
            .insert(user, keys);
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<UserId, Vec<Ed25519PublicKey>>>> {
        self.users
            .read()
            .map_err(|_| LedgerError::Transport("directory lock poisoned".into()))
    }
}

#[async_trait]
impl IdentityDirectory for MemoryDirectory {
    async fn create_user_id(&self, num_keys: usize) -> Result<(UserId, Vec<Keypair>)> {
        if num_keys == 0 {
            return Err(LedgerError::Rejected("a user needs at least one key".into()));
        }
        let user = UserId::random();
        let keypairs: Vec<Keypair> = (0..num_keys).map(|_| Keypair::generate()).collect();
        self.insert_user(user, keypairs.iter().map(Keypair::public_key).collect())?;
        debug!(?user, num_keys, "user created");
        Ok((user, keypairs))
    }

    async fn public_keys(&self, user: &UserId) -> Result<Vec<Ed25519PublicKey>> {
        self.read()?
            .get(user)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownUser(user.to_hex()))
    }

    async fn is_known(&self, user: &UserId) -> Result<bool> {
        Ok(self.read()?.contains_key(user))
    }
}
