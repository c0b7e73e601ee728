//! End-to-end registry scenarios over the in-memory ledger and both stores.

use std::sync::Arc;

use anyhow::{Context, Result};

use docreg::core::{Container, Description, DocumentError, LabelGroupId};
use docreg::ledger::{
    IdentityDirectory, LedgerError, MemoryDirectory, MemoryLedger, TransactionKind,
    TransactionLabel,
};
use docreg::store::{EntryStore, MemoryEntryStore, SqliteEntryStore};
use docreg::{
    Document, DocumentId, DocumentSpec, Keypair, Registry, RegistryConfig, RegistryError,
    RegistryRecord, SectionNode, UserId, Verification,
};

const SAMPLE_DIGEST: &str = "77564b51a95528dc78392f25ef7bcdf997dfd459a60394c6c19702c8e5a9d3a3";

struct Env {
    ledger: MemoryLedger,
    directory: Arc<MemoryDirectory>,
    authority: UserId,
    authority_key: Keypair,
}

impl Env {
    async fn new() -> Result<Self> {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let directory = Arc::new(MemoryDirectory::new());
        let (authority, mut keys) = directory.create_user_id(1).await?;
        Ok(Self {
            ledger: MemoryLedger::new(),
            directory,
            authority,
            authority_key: keys.pop().context("authority has a key")?,
        })
    }

    async fn user(&self) -> Result<(UserId, Keypair)> {
        let (id, mut keys) = self.directory.create_user_id(1).await?;
        Ok((id, keys.pop().context("user has a key")?))
    }

    fn config(&self) -> RegistryConfig {
        RegistryConfig::new(self.authority)
    }

    fn registry(&self) -> Registry<MemoryLedger, MemoryDirectory, MemoryEntryStore> {
        self.registry_with(self.config(), MemoryEntryStore::new())
    }

    fn registry_with<S: EntryStore>(
        &self,
        config: RegistryConfig,
        store: S,
    ) -> Registry<MemoryLedger, MemoryDirectory, S> {
        Registry::new(config, self.ledger.connect(), Arc::clone(&self.directory), store)
    }
}

fn sample(name: &str) -> Result<Document> {
    let sections = ["Today,", "I am", "what I am."]
        .into_iter()
        .map(SectionNode::leaf)
        .collect();
    Ok(Document::new(sections)?.with_id(DocumentId::derive(name)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration and update
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_then_update_changes_digest() -> Result<()> {
    let env = Env::new().await?;
    let (alice, alice_key) = env.user().await?;
    let registry = env.registry();

    let mut document = sample("poem")?;
    let id = document.require_id()?;
    let tx = registry
        .register(&alice, &document, DocumentSpec::default(), &alice_key, None)
        .await?;
    assert_eq!(tx.kind(), TransactionKind::Register);
    assert_eq!(registry.get_document_digest(&id).await?.to_hex(), SAMPLE_DIGEST);

    let record = RegistryRecord::from_bytes(&tx.payload)?;
    assert_eq!(record.owner, alice);
    assert_eq!(record.digest.to_hex(), SAMPLE_DIGEST);

    document.set_text(&[1], "I was")?;
    let update = registry
        .update(&alice, &alice, &document, None, &alice_key, &env.authority_key, None)
        .await?;
    assert_eq!(update.kind(), TransactionKind::Update);
    assert_eq!(update.prev(), Some(tx.compute_id()));

    let digest = registry.get_document_digest(&id).await?;
    assert_ne!(digest.to_hex(), SAMPLE_DIGEST);
    assert_eq!(digest, document.digest()?);

    let history = registry.history(&id).await?;
    let versions: Vec<_> = history.iter().map(|v| v.version).collect();
    assert_eq!(versions, vec![1, 2]);
    assert_eq!(history[0].digest.to_hex(), SAMPLE_DIGEST);
    assert_eq!(history[1].transaction_id, update.compute_id());
    Ok(())
}

#[tokio::test]
async fn update_transfers_ownership() -> Result<()> {
    let env = Env::new().await?;
    let (alice, alice_key) = env.user().await?;
    let (bob, bob_key) = env.user().await?;
    let registry = env.registry();

    let document = sample("deed")?;
    let id = document.require_id()?;
    registry
        .register(&alice, &document, DocumentSpec::default(), &alice_key, None)
        .await?;
    registry
        .update(&alice, &bob, &document, None, &alice_key, &env.authority_key, None)
        .await?;
    assert_eq!(registry.get_entry(&id).await?.owner, bob);

    // Alice no longer owns it.
    let err = registry
        .update(&alice, &alice, &document, None, &alice_key, &env.authority_key, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Authorization(_)), "{err}");

    registry
        .update(&bob, &bob, &document, None, &bob_key, &env.authority_key, None)
        .await?;
    let entry = registry.get_entry(&id).await?;
    assert_eq!(entry.version, 3);
    assert_eq!(entry.owner, bob);
    Ok(())
}

#[tokio::test]
async fn spec_is_kept_or_replaced() -> Result<()> {
    let env = Env::new().await?;
    let (alice, alice_key) = env.user().await?;
    let registry = env.registry();

    let document = sample("spec")?;
    let id = document.require_id()?;
    let first = DocumentSpec::builder().description("first").expire_at(4_000_000_000).build()?;
    registry.register(&alice, &document, first.clone(), &alice_key, None).await?;

    registry
        .update(&alice, &alice, &document, None, &alice_key, &env.authority_key, None)
        .await?;
    assert_eq!(registry.get_document_spec(&id).await?, first);

    let second = DocumentSpec::builder().description(vec![1u8, 2, 3]).build()?;
    registry
        .update(&alice, &alice, &document, Some(second.clone()), &alice_key, &env.authority_key, None)
        .await?;
    let spec = registry.get_document_spec(&id).await?;
    assert_eq!(spec, second);
    assert_eq!(spec.description(), Some(&Description::Bytes(vec![1, 2, 3])));
    Ok(())
}

#[tokio::test]
async fn frozen_spec_blocks_updates() -> Result<()> {
    let env = Env::new().await?;
    let (alice, alice_key) = env.user().await?;
    let registry = env.registry();

    let document = sample("frozen")?;
    let id = document.require_id()?;
    registry
        .register(&alice, &document, DocumentSpec::default(), &alice_key, None)
        .await?;

    let frozen = DocumentSpec::builder().option_updatable(false).build()?;
    registry
        .update(&alice, &alice, &document, Some(frozen), &alice_key, &env.authority_key, None)
        .await?;

    let err = registry
        .update(&alice, &alice, &document, None, &alice_key, &env.authority_key, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::ImmutableSpec(doc) if doc == id), "{err}");
    assert_eq!(registry.get_entry(&id).await?.version, 2);
    Ok(())
}

#[tokio::test]
async fn update_carries_label() -> Result<()> {
    let env = Env::new().await?;
    let (alice, alice_key) = env.user().await?;
    let registry = env.registry();

    let document = sample("labeled")?;
    registry
        .register(&alice, &document, DocumentSpec::default(), &alice_key, None)
        .await?;

    let group = LabelGroupId::derive("deeds");
    let label = TransactionLabel::named(group, "parcel-17", b"salt");
    let tx = registry
        .update(&alice, &alice, &document, None, &alice_key, &env.authority_key, Some(label))
        .await?;

    assert!(label.is_labeled(&tx));
    assert_eq!(label.get_label_id(&tx), Some(*label.label_id()));
    assert_eq!(
        *label.label_id(),
        TransactionLabel::create_label_id("parcel-17", b"salt")
    );

    let other = TransactionLabel::named(LabelGroupId::derive("other"), "parcel-17", b"salt");
    assert!(!other.is_labeled(&tx));
    assert_eq!(other.get_label_id(&tx), None);

    let labeled = env.ledger.transactions_labeled(&group)?;
    assert_eq!(labeled.len(), 1);
    assert_eq!(labeled[0].compute_id(), tx.compute_id());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization and lookup failures
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn authority_may_register_for_known_owner() -> Result<()> {
    let env = Env::new().await?;
    let (alice, _) = env.user().await?;
    let registry = env.registry();

    let document = sample("proxy")?;
    let tx = registry
        .register(&alice, &document, DocumentSpec::default(), &env.authority_key, None)
        .await?;
    assert!(tx.signature_for(&env.authority).is_some());
    assert_eq!(registry.get_entry(&document.require_id()?).await?.owner, alice);

    // The owner still has to exist.
    let stranger = UserId::derive("stranger");
    let err = registry
        .register(&stranger, &sample("proxy-2")?, DocumentSpec::default(), &env.authority_key, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::UnknownUser(user) if user == stranger), "{err}");
    Ok(())
}

#[tokio::test]
async fn authority_registration_can_be_disabled() -> Result<()> {
    let env = Env::new().await?;
    let (alice, _) = env.user().await?;
    let config = RegistryConfig {
        authority_may_register: false,
        ..env.config()
    };
    let registry = env.registry_with(config, MemoryEntryStore::new());

    let err = registry
        .register(&alice, &sample("proxy")?, DocumentSpec::default(), &env.authority_key, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Authorization(_)), "{err}");
    Ok(())
}

#[tokio::test]
async fn rejects_wrong_keys_and_unknown_users() -> Result<()> {
    let env = Env::new().await?;
    let (alice, alice_key) = env.user().await?;
    let (_, mallory_key) = env.user().await?;
    let registry = env.registry();

    let document = sample("keys")?;
    let id = document.require_id()?;
    let err = registry
        .register(&alice, &document, DocumentSpec::default(), &mallory_key, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Authorization(_)), "{err}");

    registry
        .register(&alice, &document, DocumentSpec::default(), &alice_key, None)
        .await?;

    let err = registry
        .update(&alice, &alice, &document, None, &mallory_key, &env.authority_key, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Authorization(_)), "{err}");

    let err = registry
        .update(&alice, &alice, &document, None, &alice_key, &mallory_key, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Authorization(_)), "{err}");

    let nobody = UserId::derive("nobody");
    let err = registry
        .update(&alice, &nobody, &document, None, &alice_key, &env.authority_key, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::UnknownUser(user) if user == nobody), "{err}");

    // None of the refused updates touched the entry.
    assert_eq!(registry.get_entry(&id).await?.version, 1);
    Ok(())
}

#[tokio::test]
async fn lookup_failures() -> Result<()> {
    let env = Env::new().await?;
    let (alice, alice_key) = env.user().await?;
    let registry = env.registry();

    let document = sample("once")?;
    registry
        .register(&alice, &document, DocumentSpec::default(), &alice_key, None)
        .await?;
    let err = registry
        .register(&alice, &document, DocumentSpec::default(), &alice_key, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyRegistered(_)), "{err}");

    let missing = sample("missing")?;
    let missing_id = missing.require_id()?;
    let err = registry
        .update(&alice, &alice, &missing, None, &alice_key, &env.authority_key, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(doc) if doc == missing_id), "{err}");
    assert!(matches!(
        registry.get_document_digest(&missing_id).await,
        Err(RegistryError::NotFound(_))
    ));
    assert!(matches!(registry.history(&missing_id).await, Err(RegistryError::NotFound(_))));

    let anonymous = Document::new(vec![SectionNode::leaf("no id")])?;
    let err = registry
        .register(&alice, &anonymous, DocumentSpec::default(), &alice_key, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Document(DocumentError::MissingDocumentId)
    ));
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn racing_updates_exactly_one_wins() -> Result<()> {
    let env = Env::new().await?;
    let (alice, alice_key) = env.user().await?;
    let first = env.registry();
    let second = env.registry();

    let document = sample("contested")?;
    let id = document.require_id()?;
    first
        .register(&alice, &document, DocumentSpec::default(), &alice_key, None)
        .await?;
    let synced = second.refresh(&id).await?;
    assert_eq!(synced, first.get_entry(&id).await?);

    let mut left = document.clone();
    left.set_text(&[0], "Yesterday,")?;
    let mut right = document.clone();
    right.set_text(&[0], "Tomorrow,")?;

    first
        .update(&alice, &alice, &left, None, &alice_key, &env.authority_key, None)
        .await?;
    let err = second
        .update(&alice, &alice, &right, None, &alice_key, &env.authority_key, None)
        .await
        .unwrap_err();
    assert!(
        matches!(err, RegistryError::Ledger(LedgerError::Conflict { .. })),
        "{err}"
    );

    // The loser's local entry is untouched until it catches up.
    assert_eq!(second.get_entry(&id).await?.version, 1);
    let caught_up = second.refresh(&id).await?;
    assert_eq!(caught_up.version, 2);
    assert_eq!(caught_up.digest, left.digest()?);
    assert_eq!(second.history(&id).await?.len(), 2);

    second
        .update(&alice, &alice, &right, None, &alice_key, &env.authority_key, None)
        .await?;
    assert_eq!(second.get_entry(&id).await?.version, 3);
    Ok(())
}

#[tokio::test]
async fn concurrent_updates_from_tasks() -> Result<()> {
    let env = Env::new().await?;
    let (alice, alice_key) = env.user().await?;
    let registries: Vec<_> = (0..4).map(|_| Arc::new(env.registry())).collect();

    let document = sample("stampede")?;
    let id = document.require_id()?;
    registries[0]
        .register(&alice, &document, DocumentSpec::default(), &alice_key, None)
        .await?;
    for registry in &registries[1..] {
        registry.refresh(&id).await?;
    }

    let mut handles = Vec::new();
    for (i, registry) in registries.iter().enumerate() {
        let registry = Arc::clone(registry);
        let mut edited = document.clone();
        edited.set_text(&[2], format!("edit {i}"))?;
        let key = alice_key.clone();
        let authority_key = env.authority_key.clone();
        handles.push(tokio::spawn(async move {
            registry
                .update(&alice, &alice, &edited, None, &key, &authority_key, None)
                .await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => accepted += 1,
            Err(RegistryError::Ledger(LedgerError::Conflict { .. })) => {}
            Err(other) => return Err(other.into()),
        }
    }
    assert_eq!(accepted, 1);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Verification
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn redacted_copy_verifies() -> Result<()> {
    let env = Env::new().await?;
    let (alice, alice_key) = env.user().await?;
    let registry = env.registry();

    let container = Container::section(vec![SectionNode::leaf("I am"), SectionNode::leaf("what I am.")])?;
    let document = Document::new(vec![SectionNode::leaf("Today,"), SectionNode::Container(container)])?
        .with_id(DocumentId::derive("nested"));
    registry
        .register(&alice, &document, DocumentSpec::default(), &alice_key, None)
        .await?;

    let mut redacted = document.clone();
    redacted.redact(&[1, 0])?;
    assert_eq!(registry.verify_document(&redacted, 0).await?, Verification::Valid);

    // A redacted copy survives a trip through markup.
    let mut shared = Document::from_markup(&redacted.to_markup())?;
    shared.set_document_id(document.require_id()?);
    assert!(registry.verify_document(&shared, 0).await?.is_valid());

    let mut tampered = document.clone();
    tampered.set_text(&[0], "Tonight,")?;
    assert!(matches!(
        registry.verify_document(&tampered, 0).await?,
        Verification::DigestMismatch { .. }
    ));
    Ok(())
}

#[tokio::test]
async fn expired_spec_fails_verification() -> Result<()> {
    let env = Env::new().await?;
    let (alice, alice_key) = env.user().await?;
    let registry = env.registry();

    let document = sample("lease")?;
    let spec = DocumentSpec::builder().expire_at(1_700_000_000).build()?;
    registry.register(&alice, &document, spec, &alice_key, None).await?;

    assert!(registry.verify_document(&document, 1_699_999_999).await?.is_valid());
    assert_eq!(
        registry.verify_document(&document, 1_700_000_000).await?,
        Verification::Expired { expire_at: 1_700_000_000 }
    );
    Ok(())
}

#[tokio::test]
async fn signed_document_registers_envelope_digest() -> Result<()> {
    let env = Env::new().await?;
    let (alice, alice_key) = env.user().await?;
    let registry = env.registry();

    let mut document = sample("signed")?;
    document.sign(&Keypair::from_seed(&[0x07; 32]));
    registry
        .register(&alice, &document, DocumentSpec::default(), &alice_key, None)
        .await?;

    let digest = registry.get_document_digest(&document.require_id()?).await?;
    assert_eq!(
        digest.to_hex(),
        "674fd24a743c7c0a5a7db956bd53389857ef70e674c5db8ece524684484de2d3"
    );

    let mut redacted = document.clone();
    redacted.redact(&[2])?;
    assert!(registry.verify_document(&redacted, 0).await?.is_valid());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle and persistence
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn close_releases_connection_once() -> Result<()> {
    let env = Env::new().await?;
    let (alice, alice_key) = env.user().await?;
    let registry = env.registry();
    assert_eq!(env.ledger.open_connections(), 2);

    registry.close()?;
    registry.close()?;
    assert_eq!(env.ledger.open_connections(), 1);

    let err = registry
        .register(&alice, &sample("late")?, DocumentSpec::default(), &alice_key, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Ledger(LedgerError::Closed)), "{err}");

    drop(registry);
    assert_eq!(env.ledger.open_connections(), 1);

    {
        let _dropped = env.registry();
        assert_eq!(env.ledger.open_connections(), 2);
    }
    assert_eq!(env.ledger.open_connections(), 1);
    Ok(())
}

#[tokio::test]
async fn sqlite_entries_survive_restart() -> Result<()> {
    let env = Env::new().await?;
    let (alice, alice_key) = env.user().await?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("registry.db");

    let document = sample("persistent")?;
    let id = document.require_id()?;
    let spec = DocumentSpec::builder().description("kept on disk").build()?;
    {
        let registry = env.registry_with(env.config(), SqliteEntryStore::open(&path)?);
        registry.register(&alice, &document, spec.clone(), &alice_key, None).await?;
        registry
            .update(&alice, &alice, &document, None, &alice_key, &env.authority_key, None)
            .await?;
        registry.close()?;
    }

    let reopened = env.registry_with(env.config(), SqliteEntryStore::open(&path)?);
    let entry = reopened.get_entry(&id).await?;
    assert_eq!(entry.version, 2);
    assert_eq!(entry.owner, alice);
    assert_eq!(entry.spec, spec);
    assert_eq!(entry.digest.to_hex(), SAMPLE_DIGEST);
    assert_eq!(reopened.history(&id).await?.len(), 2);
    assert_eq!(reopened.store().list_documents().await?, vec![id]);
    Ok(())
}
