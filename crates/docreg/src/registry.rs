//! The Registry: versioned document entries anchored on a ledger.
//!
//! Every registration and update becomes one signed ledger transaction.
//! Only after the ledger accepts it does the local entry change, so a
//! rejected or conflicting submission leaves local state untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use docreg_core::{
    Document, DocumentId, DocumentSpec, EntryVersion, Keypair, RegistryEntry, Sha256Digest,
    TransactionId, UserId,
};
use docreg_ledger::{
    IdentityDirectory, Ledger, LedgerError, Transaction, TransactionBuilder, TransactionKind,
    TransactionLabel,
};
use docreg_store::{EntryStore, PutResult, StoreError};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::record::RegistryRecord;

/// Outcome of checking a presented document against its entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid,
    /// The presented document's identity digest is not the registered one.
    DigestMismatch {
        registered: Sha256Digest,
        presented: Sha256Digest,
    },
    Expired {
        expire_at: u64,
    },
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid)
    }
}

/// The document registry.
///
/// Owns one ledger connection, released exactly once by [`Registry::close`]
/// or, failing that, on drop.
pub struct Registry<L: Ledger, D: IdentityDirectory, S: EntryStore> {
    config: RegistryConfig,
    ledger: L,
    directory: Arc<D>,
    store: Arc<S>,
    closed: AtomicBool,
}

impl<L: Ledger, D: IdentityDirectory, S: EntryStore> Registry<L, D, S> {
    /// Create a registry over an open ledger connection.
    pub fn new(config: RegistryConfig, ledger: L, directory: Arc<D>, store: S) -> Self {
        Self {
            config,
            ledger,
            directory,
            store: Arc::new(store),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a new document.
    ///
    /// `signing_key` must belong to `owner_id`, or to the registry authority
    /// when [`RegistryConfig::authority_may_register`] is set. Returns the
    /// accepted transaction.
    pub async fn register(
        &self,
        owner_id: &UserId,
        document: &Document,
        spec: DocumentSpec,
        signing_key: &Keypair,
        label: Option<TransactionLabel>,
    ) -> Result<Transaction> {
        self.ensure_open()?;
        let document_id = document.require_id()?;
        if self.store.get_entry(&document_id).await?.is_some() {
            return Err(RegistryError::AlreadyRegistered(document_id));
        }
        let signer = self.registration_signer(owner_id, signing_key).await?;
        let digest = document.digest()?;

        let record = RegistryRecord::new(*owner_id, digest, spec.clone());
        let mut builder = TransactionBuilder::register(document_id)
            .timestamp(now_millis())
            .payload(record.to_bytes());
        if let Some(label) = label {
            builder = builder.label(label);
        }
        let tx = builder.build().signed_by(signer, signing_key);

        let tx_id = self.submit(&tx).await?;
        let entry =
            RegistryEntry::registered(document_id, *owner_id, digest, spec, tx_id, tx.timestamp());
        self.store_entry(&entry, None).await?;

        info!(?document_id, ?tx_id, owner = ?owner_id, "document registered");
        Ok(tx)
    }

    /// Record a new version of a registered document.
    ///
    /// The transaction is signed by the current owner and then by the
    /// registry authority, and extends the entry's head. `new_owner_id`
    /// differing from `current_owner_id` transfers ownership. A `None`
    /// spec keeps the current one.
    ///
    /// # Errors
    /// - `NotFound` if the document has no entry.
    /// - `Authorization` if `current_owner_id` is not the owner or either
    ///   key does not authenticate for its role.
    /// - `UnknownUser` if the directory does not know `new_owner_id`.
    /// - `ImmutableSpec` if the current spec disallows updates.
    /// - `Ledger(Conflict)` if another update won the race. The local entry
    ///   is unchanged.
    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        &self,
        current_owner_id: &UserId,
        new_owner_id: &UserId,
        document: &Document,
        spec: Option<DocumentSpec>,
        signing_key: &Keypair,
        registry_signing_key: &Keypair,
        label: Option<TransactionLabel>,
    ) -> Result<Transaction> {
        self.ensure_open()?;
        let document_id = document.require_id()?;
        let entry = self.get_entry(&document_id).await?;

        if entry.owner != *current_owner_id {
            return Err(RegistryError::Authorization(format!(
                "{current_owner_id} does not own document {document_id}"
            )));
        }
        if !self.directory.authenticates(current_owner_id, &signing_key.public_key()).await? {
            return Err(RegistryError::Authorization(format!(
                "signing key does not authenticate as owner {current_owner_id}"
            )));
        }
        let registry_id = self.config.registry_id;
        if !self.directory.authenticates(&registry_id, &registry_signing_key.public_key()).await? {
            return Err(RegistryError::Authorization(
                "registry signing key does not authenticate as the registry".into(),
            ));
        }
        if !self.directory.is_known(new_owner_id).await? {
            return Err(RegistryError::UnknownUser(*new_owner_id));
        }
        if !entry.is_updatable() {
            return Err(RegistryError::ImmutableSpec(document_id));
        }

        let digest = document.digest()?;
        let spec = spec.unwrap_or_else(|| entry.spec.clone());

        let record = RegistryRecord::new(*new_owner_id, digest, spec.clone());
        let mut builder = TransactionBuilder::update(document_id, entry.head)
            .timestamp(now_millis())
            .payload(record.to_bytes());
        if let Some(label) = label {
            builder = builder.label(label);
        }
        let tx = builder
            .build()
            .signed_by(*current_owner_id, signing_key)
            .signed_by(registry_id, registry_signing_key);

        let tx_id = self.submit(&tx).await?;
        let next = entry.advanced(*new_owner_id, digest, spec, tx_id, tx.timestamp());
        self.store_entry(&next, Some(entry.head)).await?;

        info!(
            ?document_id,
            ?tx_id,
            version = next.version,
            owner = ?new_owner_id,
            "document updated"
        );
        Ok(tx)
    }

    /// Bring the local entry up to the ledger's head.
    ///
    /// Transactions accepted through other registries are replayed in
    /// order, so the local history stays complete.
    pub async fn refresh(&self, document_id: &DocumentId) -> Result<RegistryEntry> {
        self.ensure_open()?;
        let head = self
            .ledger
            .head(document_id)
            .await?
            .ok_or(RegistryError::NotFound(*document_id))?;

        let local = self.store.get_entry(document_id).await?;
        let local_head = local.as_ref().map(|e| e.head);

        let mut pending = Vec::new();
        let mut cursor = Some(head);
        while let Some(id) = cursor {
            if Some(id) == local_head {
                break;
            }
            let tx = self.ledger.get_transaction(&id).await?.ok_or_else(|| {
                LedgerError::Transport(format!("ledger has no transaction {id}"))
            })?;
            cursor = tx.prev();
            pending.push((id, tx));
        }
        if local_head.is_some() && cursor.is_none() {
            return Err(StoreError::InvalidData(format!(
                "local entry for {document_id} is not on the ledger chain"
            ))
            .into());
        }

        let mut current = local;
        for (id, tx) in pending.into_iter().rev() {
            let record = RegistryRecord::from_bytes(&tx.payload)?;
            let next = match (&current, tx.kind()) {
                (None, TransactionKind::Register) => RegistryEntry::registered(
                    *document_id,
                    record.owner,
                    record.digest,
                    record.spec,
                    id,
                    tx.timestamp(),
                ),
                (Some(entry), TransactionKind::Update) => {
                    entry.advanced(record.owner, record.digest, record.spec, id, tx.timestamp())
                }
                (_, kind) => {
                    return Err(StoreError::InvalidData(format!(
                        "unexpected {kind:?} transaction {id} in chain of {document_id}"
                    ))
                    .into())
                }
            };
            self.store_entry(&next, current.as_ref().map(|e| e.head)).await?;
            debug!(?document_id, version = next.version, "replayed ledger transaction");
            current = Some(next);
        }

        current.ok_or(RegistryError::NotFound(*document_id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn get_entry(&self, document_id: &DocumentId) -> Result<RegistryEntry> {
        self.store
            .get_entry(document_id)
            .await?
            .ok_or(RegistryError::NotFound(*document_id))
    }

    /// The current identity digest of a document.
    pub async fn get_document_digest(&self, document_id: &DocumentId) -> Result<Sha256Digest> {
        Ok(self.get_entry(document_id).await?.digest)
    }

    pub async fn get_document_spec(&self, document_id: &DocumentId) -> Result<DocumentSpec> {
        Ok(self.get_entry(document_id).await?.spec)
    }

    /// Version chain of a document, oldest first.
    pub async fn history(&self, document_id: &DocumentId) -> Result<Vec<EntryVersion>> {
        let versions = self.store.history(document_id).await?;
        if versions.is_empty() {
            return Err(RegistryError::NotFound(*document_id));
        }
        Ok(versions)
    }

    /// Check a presented document, possibly redacted, against its entry.
    pub async fn verify_document(&self, document: &Document, now_secs: u64) -> Result<Verification> {
        let document_id = document.require_id()?;
        let entry = self.get_entry(&document_id).await?;
        let presented = document.digest()?;

        if presented != entry.digest {
            return Ok(Verification::DigestMismatch {
                registered: entry.digest,
                presented,
            });
        }
        if entry.spec.is_expired_at(now_secs) {
            return Ok(Verification::Expired {
                expire_at: entry.spec.expire_at(),
            });
        }
        Ok(Verification::Valid)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Release the ledger connection. Later calls are no-ops.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.ledger.close()?;
        debug!("registry closed");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(LedgerError::Closed.into());
        }
        Ok(())
    }

    /// Who signs a registration made with `key`.
    async fn registration_signer(&self, owner_id: &UserId, key: &Keypair) -> Result<UserId> {
        let public_key = key.public_key();
        if self.directory.authenticates(owner_id, &public_key).await? {
            return Ok(*owner_id);
        }

        let registry_id = self.config.registry_id;
        if self.config.authority_may_register
            && self.directory.authenticates(&registry_id, &public_key).await?
        {
            if !self.directory.is_known(owner_id).await? {
                return Err(RegistryError::UnknownUser(*owner_id));
            }
            return Ok(registry_id);
        }

        Err(RegistryError::Authorization(format!(
            "signing key does not authenticate as owner {owner_id}"
        )))
    }

    async fn submit(&self, tx: &Transaction) -> Result<TransactionId> {
        match self.ledger.submit(tx).await {
            Ok(id) => {
                debug!(tx_id = ?id, kind = ?tx.kind(), "ledger accepted transaction");
                Ok(id)
            }
            Err(e) => {
                warn!(document_id = ?tx.document_id(), error = %e, "ledger refused transaction");
                Err(e.into())
            }
        }
    }

    async fn store_entry(&self, entry: &RegistryEntry, expected: Option<TransactionId>) -> Result<()> {
        match self.store.put_entry(entry, expected).await? {
            PutResult::Applied => Ok(()),
            PutResult::Stale { current } => Err(StoreError::InvalidData(format!(
                "local entry for {} moved to {current:?} while {} was in flight",
                entry.document_id, entry.head
            ))
            .into()),
        }
    }
}

impl<L: Ledger, D: IdentityDirectory, S: EntryStore> Drop for Registry<L, D, S> {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            if let Err(e) = self.ledger.close() {
                warn!(error = %e, "failed to release ledger connection");
            }
        }
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docreg_ledger::{MemoryDirectory, MemoryLedger};
    use docreg_store::MemoryEntryStore;

    async fn setup() -> (MemoryLedger, Registry<MemoryLedger, MemoryDirectory, MemoryEntryStore>) {
        let directory = Arc::new(MemoryDirectory::new());
        let (registry_id, _) = directory.create_user_id(1).await.unwrap();
        let ledger = MemoryLedger::new();
        let registry = Registry::new(
            RegistryConfig::new(registry_id),
            ledger.connect(),
            directory,
            MemoryEntryStore::new(),
        );
        (ledger, registry)
    }

    #[tokio::test]
    async fn test_close_releases_once() {
        let (ledger, registry) = setup().await;
        assert_eq!(ledger.open_connections(), 2);

        registry.close().unwrap();
        registry.close().unwrap();
        assert_eq!(ledger.open_connections(), 1);
        assert!(registry.is_closed());

        drop(registry);
        assert_eq!(ledger.open_connections(), 1);
    }

    #[tokio::test]
    async fn test_drop_releases_connection() {
        let (ledger, registry) = setup().await;
        drop(registry);
        assert_eq!(ledger.open_connections(), 1);
    }

    #[tokio::test]
    async fn test_writes_after_close_fail() {
        let (_ledger, registry) = setup().await;
        registry.close().unwrap();

        let document = Document::new(vec![docreg_core::SectionNode::leaf("x")])
            .unwrap()
            .with_id(DocumentId::derive("doc"));
        let err = registry
            .register(&UserId::derive("u"), &document, DocumentSpec::default(), &Keypair::generate(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Ledger(LedgerError::Closed)));
    }

    #[test]
    fn test_verification_is_valid() {
        assert!(Verification::Valid.is_valid());
        assert!(!Verification::Expired { expire_at: 1 }.is_valid());
    }
}
