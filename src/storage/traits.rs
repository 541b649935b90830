//! Storage traits and error types
//!
//! This module defines the trait interface for result stores and
//! associated error types.

use crate::record::ResultRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("No record for {0}")]
    NotFound(String),

    #[error("Malformed record for {domain}: {reason}")]
    Malformed { domain: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// Returns true if the error concerns one stored value rather than the store
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Streaming scan over `(domain, record)` pairs in key order
///
/// A record that cannot be decoded is yielded as [`StorageError::Malformed`]
/// and the scan continues with the next key.
pub type RecordIter<'a> = Box<dyn Iterator<Item = StorageResult<(String, ResultRecord)>> + 'a>;

/// Streaming scan over stored domains in key order
pub type KeyIter<'a> = Box<dyn Iterator<Item = StorageResult<String>> + 'a>;

/// Durable map from domain to its paired result record
///
/// Writes overwrite; uniqueness is the orchestrator's job via [`has`](Self::has).
/// A store has a single writer; concurrent crawls against one store are not
/// supported.
pub trait ResultStore {
    /// Returns true if a record exists for `domain`
    fn has(&self, domain: &str) -> StorageResult<bool>;

    /// Reads the record for `domain`, or [`StorageError::NotFound`]
    fn get(&self, domain: &str) -> StorageResult<ResultRecord>;

    /// Durably writes both legs for `domain` as one value
    fn put(&mut self, domain: &str, record: &ResultRecord) -> StorageResult<()>;

    /// Scans every record without loading the whole table
    fn iter(&self) -> RecordIter<'_>;

    /// Scans every stored domain
    fn keys(&self) -> KeyIter<'_>;

    /// Counts stored records by walking the keys
    fn count(&self) -> StorageResult<u64> {
        let mut n = 0;
        for key in self.keys() {
            key?;
            n += 1;
        }
        Ok(n)
    }
}
