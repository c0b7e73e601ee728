//! SQLite implementation of the EntryStore trait.
//!
//! rusqlite with bundled SQLite, wrapped in async via `tokio::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use docreg_core::{
    DocumentId, DocumentSpec, EntryVersion, RegistryEntry, Sha256Digest, TransactionId, UserId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{EntryStore, PutResult};

/// SQLite-backed entry store.
///
/// Thread-safe via internal Mutex. All operations run on the blocking pool.
pub struct SqliteEntryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEntryStore {
    /// Open a SQLite database at the given path, creating and migrating it
    /// if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

fn blob32(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<[u8; 32]> {
    let bytes: Vec<u8> = row.get(idx)?;
    bytes.try_into().map_err(|_| {
        rusqlite::Error::InvalidColumnType(idx, format!("column {idx} is not 32 bytes"), Type::Blob)
    })
}

const ENTRY_COLUMNS: &str =
    "document_id, owner, digest, spec, head, version, created_at, updated_at";

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<RegistryEntry> {
    let spec_bytes: Vec<u8> = row.get(3)?;
    let (_, spec) = DocumentSpec::from_serialized_data(0, &spec_bytes)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Blob, Box::new(e)))?;

    Ok(RegistryEntry {
        document_id: DocumentId::from_bytes(blob32(row, 0)?),
        owner: UserId::from_bytes(blob32(row, 1)?),
        digest: Sha256Digest::from_bytes(blob32(row, 2)?),
        spec,
        head: TransactionId::from_bytes(blob32(row, 4)?),
        version: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn row_to_version(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryVersion> {
    Ok(EntryVersion {
        version: row.get(0)?,
        transaction_id: TransactionId::from_bytes(blob32(row, 1)?),
        digest: Sha256Digest::from_bytes(blob32(row, 2)?),
        owner: UserId::from_bytes(blob32(row, 3)?),
        timestamp: row.get(4)?,
    })
}

#[async_trait]
impl EntryStore for SqliteEntryStore {
    async fn get_entry(&self, document_id: &DocumentId) -> Result<Option<RegistryEntry>> {
        let document_id = *document_id;
        self.run(move |conn| {
            let entry = conn
                .query_row(
                    &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE document_id = ?1"),
                    params![document_id.as_bytes().as_slice()],
                    row_to_entry,
                )
                .optional()?;
            Ok(entry)
        })
        .await
    }

    async fn put_entry(
        &self,
        entry: &RegistryEntry,
        expected_head: Option<TransactionId>,
    ) -> Result<PutResult> {
        let entry = entry.clone();
        self.run(move |conn| {
            let tx = conn.transaction()?;

            let current: Option<[u8; 32]> = tx
                .query_row(
                    "SELECT head FROM entries WHERE document_id = ?1",
                    params![entry.document_id.as_bytes().as_slice()],
                    |row| blob32(row, 0),
                )
                .optional()?;
            let current = current.map(TransactionId::from_bytes);
            if current != expected_head {
                tracing::debug!(document_id = ?entry.document_id, ?current, ?expected_head, "stale entry write");
                return Ok(PutResult::Stale { current });
            }

            tx.execute(
                &format!(
                    "INSERT OR REPLACE INTO entries ({ENTRY_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                params![
                    entry.document_id.as_bytes().as_slice(),
                    entry.owner.as_bytes().as_slice(),
                    entry.digest.as_bytes().as_slice(),
                    entry.spec.serialize(),
                    entry.head.as_bytes().as_slice(),
                    entry.version,
                    entry.created_at,
                    entry.updated_at,
                ],
            )?;

            let version = entry.version_record();
            tx.execute(
                "INSERT INTO document_versions
                     (document_id, version, transaction_id, digest, owner, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.document_id.as_bytes().as_slice(),
                    version.version,
                    version.transaction_id.as_bytes().as_slice(),
                    version.digest.as_bytes().as_slice(),
                    version.owner.as_bytes().as_slice(),
                    version.timestamp,
                ],
            )?;

            tx.commit()?;
            Ok(PutResult::Applied)
        })
        .await
    }

    async fn history(&self, document_id: &DocumentId) -> Result<Vec<EntryVersion>> {
        let document_id = *document_id;
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT version, transaction_id, digest, owner, timestamp
                 FROM document_versions WHERE document_id = ?1 ORDER BY version",
            )?;
            let versions = stmt
                .query_map(params![document_id.as_bytes().as_slice()], row_to_version)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(versions)
        })
        .await
    }

    async fn list_documents(&self) -> Result<Vec<DocumentId>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT document_id FROM entries ORDER BY document_id")?;
            let ids = stmt
                .query_map([], |row| blob32(row, 0).map(DocumentId::from_bytes))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }
}
