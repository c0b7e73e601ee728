//! Test fixtures and helpers.
//!
//! Common setup code for integration tests. Users get deterministic keys
//! derived from their names, so runs are reproducible.

use std::sync::Arc;

use docreg::{Registry, RegistryConfig};
use docreg_core::{
    Container, Document, DocumentId, DocumentSpec, Ed25519PublicKey, Keypair, SectionNode,
    Sha256Digest, UserId,
};
use docreg_ledger::{MemoryDirectory, MemoryLedger};
use docreg_store::{EntryStore, MemoryEntryStore};

/// A registry over the in-memory ledger, directory and store.
pub type MemoryRegistry = Registry<MemoryLedger, MemoryDirectory, MemoryEntryStore>;

/// Texts of the three-leaf sample document.
pub const SAMPLE_TEXTS: [&str; 3] = ["Today,", "I am", "what I am."];

/// A directory user with a single key.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: UserId,
    pub keypair: Keypair,
}

impl TestUser {
    /// Derive the id and key from `name`.
    pub fn named(name: &str) -> Self {
        Self {
            id: UserId::derive(name),
            keypair: Keypair::from_seed(&Sha256Digest::hash(name.as_bytes()).0),
        }
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }
}

/// A shared ledger and directory with a registry authority already enrolled.
///
/// Every registry built from one fixture holds its own ledger connection to
/// the same ledger state.
pub struct RegistryFixture {
    pub ledger: MemoryLedger,
    pub directory: Arc<MemoryDirectory>,
    pub authority: TestUser,
}

impl RegistryFixture {
    pub fn new() -> Self {
        let fixture = Self {
            ledger: MemoryLedger::new(),
            directory: Arc::new(MemoryDirectory::new()),
            authority: TestUser::named("registry-authority"),
        };
        fixture.enroll(&fixture.authority);
        fixture
    }

    /// Create and enroll a user.
    pub fn user(&self, name: &str) -> TestUser {
        let user = TestUser::named(name);
        self.enroll(&user);
        user
    }

    /// Bind a user's key in the directory.
    pub fn enroll(&self, user: &TestUser) {
        self.directory
            .insert_user(user.id, vec![user.public_key()])
            .expect("memory directory accepts users");
    }

    pub fn config(&self) -> RegistryConfig {
        RegistryConfig::new(self.authority.id)
    }

    /// A registry with a fresh in-memory store.
    pub fn registry(&self) -> MemoryRegistry {
        self.registry_with_store(MemoryEntryStore::new())
    }

    pub fn registry_with_store<S: EntryStore>(
        &self,
        store: S,
    ) -> Registry<MemoryLedger, MemoryDirectory, S> {
        self.registry_with_config(self.config(), store)
    }

    pub fn registry_with_config<S: EntryStore>(
        &self,
        config: RegistryConfig,
        store: S,
    ) -> Registry<MemoryLedger, MemoryDirectory, S> {
        Registry::new(config, self.ledger.connect(), Arc::clone(&self.directory), store)
    }
}

impl Default for RegistryFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// The three-leaf sample document, identified by `name`.
pub fn sample_document(name: &str) -> Document {
    Document::new(SAMPLE_TEXTS.iter().map(|t| SectionNode::leaf(*t)).collect())
        .expect("sample has sections")
        .with_id(DocumentId::derive(name))
}

/// The sample texts with the last two grouped in a container.
pub fn nested_document(name: &str) -> Document {
    let container = Container::section(vec![
        SectionNode::leaf(SAMPLE_TEXTS[1]),
        SectionNode::leaf(SAMPLE_TEXTS[2]),
    ])
    .expect("container has children");
    Document::new(vec![
        SectionNode::leaf(SAMPLE_TEXTS[0]),
        SectionNode::Container(container),
    ])
    .expect("nested sample has sections")
    .with_id(DocumentId::derive(name))
}

/// A spec that forbids further updates.
pub fn frozen_spec(description: &str) -> DocumentSpec {
    DocumentSpec::builder()
        .description(description)
        .option_updatable(false)
        .build()
        .expect("frozen spec is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectors::SAMPLE_DIGEST;
    use docreg_ledger::IdentityDirectory;

    #[test]
    fn test_users_are_deterministic() {
        let a = TestUser::named("alice");
        let b = TestUser::named("alice");
        assert_eq!(a.id, b.id);
        assert_eq!(a.public_key(), b.public_key());
        assert_ne!(a.public_key(), TestUser::named("bob").public_key());
    }

    #[tokio::test]
    async fn test_fixture_enrolls_users() {
        let fixture = RegistryFixture::new();
        let alice = fixture.user("alice");

        assert!(fixture.directory.is_known(&fixture.authority.id).await.unwrap());
        assert!(fixture.directory.authenticates(&alice.id, &alice.public_key()).await.unwrap());
        assert!(!fixture
            .directory
            .authenticates(&alice.id, &fixture.authority.public_key())
            .await
            .unwrap());
    }

    #[test]
    fn test_registries_share_ledger() {
        let fixture = RegistryFixture::new();
        let first = fixture.registry();
        let second = fixture.registry();
        assert_eq!(fixture.ledger.open_connections(), 3);

        drop(first);
        second.close().unwrap();
        assert_eq!(fixture.ledger.open_connections(), 1);
    }

    #[test]
    fn test_sample_documents() {
        let flat = sample_document("doc");
        let nested = nested_document("doc");
        assert_eq!(flat.digest().unwrap().to_hex(), SAMPLE_DIGEST);
        assert_ne!(flat.digest().unwrap(), nested.digest().unwrap());
        assert_eq!(flat.document_id(), nested.document_id());
        assert!(!frozen_spec("final").option_updatable());
    }
}
