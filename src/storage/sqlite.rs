//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ResultStore trait.

use crate::record::ResultRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{KeyIter, RecordIter, ResultStore, StorageError, StorageResult};
use crate::storage::{decode_record, encode_record};
use chrono::Utc;
use rusqlite::types::{ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::collections::VecDeque;
use std::path::Path;

/// Rows fetched per page during a scan
const SCAN_PAGE_SIZE: i64 = 512;

const SCAN_RECORDS_SQL: &str = "SELECT domain, record FROM results
     WHERE ?1 IS NULL OR domain > ?1 ORDER BY domain LIMIT ?2";

const SCAN_KEYS_SQL: &str = "SELECT domain, NULL FROM results
     WHERE ?1 IS NULL OR domain > ?1 ORDER BY domain LIMIT ?2";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        tracing::debug!("Opened result store at {}", path.display());
        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Closes the database, reporting any error from the final flush
    pub fn close(self) -> StorageResult<()> {
        self.conn.close().map_err(|(_, e)| StorageError::from(e))
    }
}

impl ResultStore for SqliteStore {
    fn has(&self, domain: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .prepare_cached("SELECT 1 FROM results WHERE domain = ?1")?
            .query_row(params![domain], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    fn get(&self, domain: &str) -> StorageResult<ResultRecord> {
        let raw: Option<String> = self
            .conn
            .prepare_cached("SELECT record FROM results WHERE domain = ?1")?
            .query_row(params![domain], |row| row.get(0))
            .optional()?;

        match raw {
            Some(raw) => decode_record(domain, &raw),
            None => Err(StorageError::NotFound(domain.to_string())),
        }
    }

    fn put(&mut self, domain: &str, record: &ResultRecord) -> StorageResult<()> {
        let encoded = encode_record(record)?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .prepare_cached(
                "INSERT INTO results (domain, record, recorded_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(domain) DO UPDATE SET
                     record = excluded.record,
                     recorded_at = excluded.recorded_at",
            )?
            .execute(params![domain, encoded, now])?;
        Ok(())
    }

    fn iter(&self) -> RecordIter<'_> {
        let pages = Pager::new(&self.conn, SCAN_RECORDS_SQL);
        Box::new(pages.map(|row| {
            let row = row?;
            let domain = decode_key(row.key)?;
            let raw = match row.value {
                Ok(bytes) => String::from_utf8(bytes).map_err(|e| StorageError::Malformed {
                    domain: domain.clone(),
                    reason: e.to_string(),
                })?,
                Err(kind) => {
                    return Err(StorageError::Malformed {
                        domain,
                        reason: format!("unexpected value type {}", kind),
                    })
                }
            };
            let record = decode_record(&domain, &raw)?;
            Ok((domain, record))
        }))
    }

    fn keys(&self) -> KeyIter<'_> {
        let pages = Pager::new(&self.conn, SCAN_KEYS_SQL);
        Box::new(pages.map(|row| decode_key(row?.key)))
    }

    fn count(&self) -> StorageResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

/// Keyset-paginated scan over the results table
///
/// Holds at most one page of rows; each page restarts the query after the
/// last key seen, so no statement stays open between pages. Columns are kept
/// as raw bytes here so one undecodable row never fails its page.
struct Pager<'a> {
    conn: &'a Connection,
    sql: &'static str,
    after: Option<Vec<u8>>,
    buffer: VecDeque<RawRow>,
    exhausted: bool,
}

/// One row as stored, before any text decoding
struct RawRow {
    key: Vec<u8>,
    value: Result<Vec<u8>, Type>,
}

/// Binds stored key bytes back as TEXT, valid UTF-8 or not
struct RawKey<'a>(&'a [u8]);

impl ToSql for RawKey<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(ValueRef::Text(self.0)))
    }
}

impl<'a> Pager<'a> {
    fn new(conn: &'a Connection, sql: &'static str) -> Self {
        Self {
            conn,
            sql,
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn fill(&mut self) -> StorageResult<()> {
        let mut stmt = self.conn.prepare_cached(self.sql)?;
        let after = self.after.as_deref().map(RawKey);
        let rows = stmt.query_map(params![after, SCAN_PAGE_SIZE], read_row)?;
        for row in rows {
            self.buffer.push_back(row?);
        }

        if (self.buffer.len() as i64) < SCAN_PAGE_SIZE {
            self.exhausted = true;
        }
        if let Some(last) = self.buffer.back() {
            self.after = Some(last.key.clone());
        }
        Ok(())
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        key: raw_bytes(row.get_ref(0)?).unwrap_or_default(),
        value: raw_bytes(row.get_ref(1)?),
    })
}

fn raw_bytes(value: ValueRef<'_>) -> Result<Vec<u8>, Type> {
    match value {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Ok(bytes.to_vec()),
        other => Err(other.data_type()),
    }
}

/// Decodes a stored key, naming it lossily when it is not UTF-8
fn decode_key(key: Vec<u8>) -> StorageResult<String> {
    String::from_utf8(key).map_err(|e| StorageError::Malformed {
        domain: String::from_utf8_lossy(e.as_bytes()).into_owned(),
        reason: format!("key is not valid UTF-8: {}", e.utf8_error()),
    })
}

impl Iterator for Pager<'_> {
    type Item = StorageResult<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
