//! Storage module for persisting paired fetch results
//!
//! This module handles all durable state for the crawler:
//! - SQLite database initialization and schema management
//! - Write-once-per-run result records keyed by domain
//! - Streaming, key-ordered scans for the report pass

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{KeyIter, RecordIter, ResultStore, StorageError, StorageResult};

use std::path::Path;

/// Opens (or creates) the result store at `path`
///
/// The returned store closes its database when dropped, so every exit path
/// releases it; call [`SqliteStore::close`] to observe close errors.
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::open(path)
}

/// Decodes a stored record value, naming the domain on failure
pub(crate) fn decode_record(
    domain: &str,
    raw: &str,
) -> StorageResult<crate::record::ResultRecord> {
    serde_json::from_str(raw).map_err(|e| StorageError::Malformed {
        domain: domain.to_string(),
        reason: e.to_string(),
    })
}

/// Encodes a record for storage
pub(crate) fn encode_record(record: &crate::record::ResultRecord) -> StorageResult<String> {
    serde_json::to_string(record).map_err(|e| StorageError::Serialization(e.to_string()))
}
