//! # docreg store
//!
//! The registry's local index of entries and their version chains.
//!
//! - [`EntryStore`] - async trait, compare-and-swap on the head transaction
//! - [`MemoryEntryStore`] - for tests
//! - [`SqliteEntryStore`] - bundled SQLite with versioned migrations

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryEntryStore;
pub use sqlite::SqliteEntryStore;
pub use traits::{EntryStore, PutResult};

/// Current time in Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
