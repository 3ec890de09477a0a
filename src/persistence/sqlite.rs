//! SQLite-backed key-value store.
//!
//! A batch runs inside a single transaction; if any statement fails the
//! transaction is dropped and rolled back, leaving the previous values.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::KeyValueStore;
use crate::error::StorageError;

/// Key-value store in a `kv_store` table.
#[derive(Debug)]
pub struct SqliteKeyValueStore {
    /// Path of the database file, `None` for an in-memory database.
    pub db_path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    /// Open (or create) the database at `db_path`.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&db_path)?;
        let store = Self {
            db_path: Some(db_path),
            conn: Mutex::new(conn),
        };
        store.init_db()?;
        Ok(store)
    }

    /// A private in-memory database.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let store = Self {
            db_path: None,
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|e| StorageError::LockPoisoned {
            message: e.to_string(),
        })
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write_batch(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }
        tx.commit()?;
        log::debug!("SqliteKeyValueStore::write_batch: {} keys", entries.len());
        Ok(())
    }
}
