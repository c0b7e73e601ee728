//! In-memory implementation of the EntryStore trait.
//!
//! Same semantics as SQLite, no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use docreg_core::{DocumentId, EntryVersion, RegistryEntry, TransactionId};

use crate::error::{Result, StoreError};
use crate::traits::{EntryStore, PutResult};

/// In-memory entry store. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryEntryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    entries: HashMap<DocumentId, RegistryEntry>,
    versions: HashMap<DocumentId, Vec<EntryVersion>>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::LockPoisoned(e.to_string())
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn get_entry(&self, document_id: &DocumentId) -> Result<Option<RegistryEntry>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.entries.get(document_id).cloned())
    }

    async fn put_entry(
        &self,
        entry: &RegistryEntry,
        expected_head: Option<TransactionId>,
    ) -> Result<PutResult> {
        let mut inner = self.inner.write().map_err(poisoned)?;

        let current = inner.entries.get(&entry.document_id).map(|e| e.head);
        if current != expected_head {
            return Ok(PutResult::Stale { current });
        }

        inner
            .versions
            .entry(entry.document_id)
            .or_default()
            .push(entry.version_record());
        inner.entries.insert(entry.document_id, entry.clone());
        Ok(PutResult::Applied)
    }

    async fn history(&self, document_id: &DocumentId) -> Result<Vec<EntryVersion>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.versions.get(document_id).cloned().unwrap_or_default())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentId>> {
        let inner = self.inner.read().map_err(poisoned)?;
        let mut ids: Vec<_> = inner.entries.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}
