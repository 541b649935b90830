//! In-memory result store
//!
//! Keeps encoded records in a sorted map so scans see the same key order and
//! decode behaviour as the SQLite store.

use crate::record::ResultRecord;
use crate::storage::traits::{KeyIter, RecordIter, ResultStore, StorageError, StorageResult};
use crate::storage::{decode_record, encode_record};
use std::collections::{BTreeMap, HashSet};

/// Result store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, String>,
    rejected: HashSet<String>,
    writes: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an already-encoded value, such as one written by an older crawl
    pub fn insert_raw(&mut self, domain: &str, raw: impl Into<String>) {
        self.records.insert(domain.to_string(), raw.into());
    }

    /// Makes every future write for `domain` fail
    pub fn reject_writes_for(&mut self, domain: &str) {
        self.rejected.insert(domain.to_string());
    }

    /// Number of successful writes
    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ResultStore for MemoryStore {
    fn has(&self, domain: &str) -> StorageResult<bool> {
        Ok(self.records.contains_key(domain))
    }

    fn get(&self, domain: &str) -> StorageResult<ResultRecord> {
        let raw = self
            .records
            .get(domain)
            .ok_or_else(|| StorageError::NotFound(domain.to_string()))?;
        decode_record(domain, raw)
    }

    fn put(&mut self, domain: &str, record: &ResultRecord) -> StorageResult<()> {
        if self.rejected.contains(domain) {
            return Err(StorageError::Database(format!("write rejected for {}", domain)));
        }
        let encoded = encode_record(record)?;
        self.records.insert(domain.to_string(), encoded);
        self.writes += 1;
        Ok(())
    }

    fn iter(&self) -> RecordIter<'_> {
        Box::new(
            self.records
                .iter()
                .map(|(domain, raw)| decode_record(domain, raw).map(|r| (domain.clone(), r))),
        )
    }

    fn keys(&self) -> KeyIter<'_> {
        Box::new(self.records.keys().cloned().map(Ok))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Transcript;

    fn record() -> ResultRecord {
        ResultRecord::new(
            Transcript::loaded(vec![], "http://a.com/", None),
            Transcript::loaded(vec![], "https://a.com/", None),
        )
    }

    #[test]
    fn test_rejected_write_leaves_domain_absent() {
        let mut store = MemoryStore::new();
        store.reject_writes_for("a.com");

        assert!(store.put("a.com", &record()).is_err());
        assert!(!store.has("a.com").unwrap());
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_raw_legacy_record_decodes() {
        let mut store = MemoryStore::new();
        store.insert_raw(
            "a.com",
            r#"{"insecure": {"responses": [], "final_url": "http://a.com/", "img_hash": null},
                "secure": {"responses": [], "errorMessage": "net::ERR_CONNECTION_REFUSED"}}"#,
        );

        let record = store.get("a.com").unwrap();
        assert_eq!(record.insecure.final_url, "http://a.com/");
        assert!(record.secure.error.is_some());
        assert_eq!(store.count().unwrap(), 1);
    }
}
