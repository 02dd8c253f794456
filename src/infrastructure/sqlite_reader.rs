//! `SQLite` database reader for Cursor's state.vscdb files.
//!
//! Two tables matter: `cursorDiskKV` (large per-bubble and per-composer
//! records) and `ItemTable` (VS Code style settings blobs). Either may be
//! absent; absence reads as "no entries", never as an error.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension};

use crate::domain::{AppError, Result};

const DISK_KV_TABLE: &str = "cursorDiskKV";
const ITEM_TABLE: &str = "ItemTable";

/// Raw key-value pair from the database.
#[derive(Debug)]
pub struct RawKvEntry {
    pub key: String,
    pub value: Vec<u8>,
}

/// Read-only `SQLite` reader for Cursor state databases.
///
/// The connection is closed when the reader is dropped.
pub struct StateDbReader {
    conn: Connection,
    path: PathBuf,
}

impl StateDbReader {
    /// Opens a state database in read-only mode.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or is not a database.
    pub fn open(path: &Path) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(path, flags).map_err(AppError::database)?;

        conn.execute_batch(
            "PRAGMA query_only = ON;
             PRAGMA temp_store = MEMORY;",
        )
        .map_err(AppError::database)?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Path of the underlying database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path rendered for diagnostics and export metadata.
    #[must_use]
    pub fn path_string(&self) -> String {
        self.path.display().to_string()
    }

    /// Whether a table with the given name exists.
    ///
    /// # Errors
    /// Returns error if `sqlite_master` cannot be queried (corrupt file).
    pub fn has_table(&self, name: &str) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |_| Ok(()),
            )
            .optional()
            .map(|row| row.is_some())
            .map_err(AppError::database)
    }

    /// Fetches `cursorDiskKV` entries whose key starts with `prefix`.
    ///
    /// Rows with a NULL value or an unreadable column are skipped.
    ///
    /// # Errors
    /// Returns error if the query itself fails.
    pub fn fetch_disk_kv(&self, prefix: &str) -> Result<Vec<RawKvEntry>> {
        if !self.has_table(DISK_KV_TABLE)? {
            tracing::debug!("No {} table in {}", DISK_KV_TABLE, self.path.display());
            return Ok(Vec::new());
        }

        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM cursorDiskKV WHERE key LIKE ?1 ORDER BY rowid")
            .map_err(AppError::database)?;

        let pattern = format!("{prefix}%");
        let rows = stmt
            .query_map([&pattern], |row| {
                let key: String = row.get(0)?;
                // Handle both TEXT and BLOB value types
                let value = match row.get_ref(1)? {
                    ValueRef::Blob(b) => Some(b.to_vec()),
                    ValueRef::Text(t) => Some(t.to_vec()),
                    _ => None,
                };
                Ok(value.map(|value| RawKvEntry { key, value }))
            })
            .map_err(AppError::database)?;

        let mut entries = Vec::new();
        for row in rows {
            match row {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Failed to read row: {}", e);
                }
            }
        }

        tracing::debug!("Fetched {} entries with prefix '{}'", entries.len(), prefix);

        Ok(entries)
    }

    /// Fetches the raw value stored under `key` in `ItemTable`.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn fetch_item(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if !self.has_table(ITEM_TABLE)? {
            return Ok(None);
        }

        self.conn
            .query_row("SELECT value FROM ItemTable WHERE key = ?1", [key], |row| {
                Ok(match row.get_ref(0)? {
                    ValueRef::Blob(b) => Some(b.to_vec()),
                    ValueRef::Text(t) => Some(t.to_vec()),
                    _ => None,
                })
            })
            .optional()
            .map(Option::flatten)
            .map_err(AppError::database)
    }

    /// Fetches and decodes the JSON document stored under `key` in `ItemTable`.
    ///
    /// Missing tables, missing keys, query failures and invalid JSON all
    /// yield `None`.
    #[must_use]
    pub fn item_json(&self, key: &str) -> Option<serde_json::Value> {
        let raw = match self.fetch_item(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::debug!("Failed to read {} from {}: {}", key, self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Failed to parse JSON for {}: {}", key, e);
                None
            }
        }
    }
}
