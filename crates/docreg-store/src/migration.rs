//! Database schema migrations for SQLite.
//!
//! Each migration moves the schema from version N to N+1 inside one SQL
//! transaction.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {current} is newer than supported version {CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;
        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;
            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, crate::now_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }
        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: entries and their version chain.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Current state per document
        CREATE TABLE entries (
            document_id BLOB PRIMARY KEY,     -- 32 bytes
            owner BLOB NOT NULL,              -- 32 bytes, UserId
            digest BLOB NOT NULL,             -- 32 bytes, SHA-256 identity digest
            spec BLOB NOT NULL,               -- canonical DocumentSpec record
            head BLOB NOT NULL,               -- 32 bytes, latest TransactionId
            version INTEGER NOT NULL,         -- 1 after register
            created_at INTEGER NOT NULL,      -- Unix ms
            updated_at INTEGER NOT NULL       -- Unix ms
        );

        -- One row per accepted register/update
        CREATE TABLE document_versions (
            document_id BLOB NOT NULL,
            version INTEGER NOT NULL,
            transaction_id BLOB NOT NULL,
            digest BLOB NOT NULL,
            owner BLOB NOT NULL,
            timestamp INTEGER NOT NULL,
            PRIMARY KEY (document_id, version)
        );

        CREATE INDEX idx_versions_transaction ON document_versions(transaction_id);
        CREATE INDEX idx_entries_owner ON entries(owner);
        "#,
    )?;
    Ok(())
}
