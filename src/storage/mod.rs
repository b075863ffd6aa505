//! Durable key-value storage for client state
//!
//! [`KeyValueStorage`] is the capability handed to the conversation store.
//! [`SqliteStorage`] is the on-disk implementation; [`MemoryStorage`] backs
//! tests and throwaway sessions.

use crate::error::{ChatlineError, StoreResult};
use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

pub mod memory;
pub mod types;
pub use memory::MemoryStorage;
pub use types::StorageKey;

/// Environment variable that overrides the default database location
pub const DB_PATH_ENV: &str = "CHATLINE_DB";

/// Key-value capability used by the conversation store
///
/// Every write replaces the whole value of a key; readers never observe a
/// partially written value.
pub trait KeyValueStorage: Send {
    /// Reads a key; `Ok(None)` when the key was never written
    fn get(&self, key: StorageKey) -> StoreResult<Option<String>>;

    /// Replaces the value of a key
    fn set(&self, key: StorageKey, value: &str) -> StoreResult<()>;

    /// Deletes a key; deleting an absent key is not an error
    fn remove(&self, key: StorageKey) -> StoreResult<()>;

    /// Applies several writes; `None` removes the key
    ///
    /// Implementations that can should apply the batch atomically.
    fn write_batch(&self, entries: &[(StorageKey, Option<String>)]) -> StoreResult<()> {
        for (key, value) in entries {
            match value {
                Some(v) => self.set(*key, v)?,
                None => self.remove(*key)?,
            }
        }
        Ok(())
    }
}

fn storage_err(context: &str, e: impl std::fmt::Display) -> ChatlineError {
    ChatlineError::Storage(format!("{}: {}", context, e))
}

/// SQLite-backed key-value storage
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a new storage instance
    ///
    /// Uses `CHATLINE_DB` when set, otherwise `state.db` in the user's data
    /// directory.
    pub fn new() -> StoreResult<Self> {
        if let Ok(override_path) = std::env::var(DB_PATH_ENV) {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "chatline", "chatline")
            .ok_or_else(|| ChatlineError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .map_err(|e| storage_err("Failed to create data directory", e))?;

        Self::new_with_path(data_dir.join("state.db"))
    }

    /// Create a new storage instance that uses the specified database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatline::storage::SqliteStorage;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("state.db")).unwrap();
    /// assert!(storage.db_path().ends_with("state.db"));
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> StoreResult<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| storage_err("Failed to create parent directory for database", e))?;
            }
        }

        let storage = Self { db_path };
        storage.init()?;
        tracing::debug!("Opened state database at {}", storage.db_path.display());
        Ok(storage)
    }

    /// Location of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> StoreResult<Connection> {
        Connection::open(&self.db_path).map_err(|e| storage_err("Failed to open database", e))
    }

    fn init(&self) -> StoreResult<()> {
        let conn = self.open()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| storage_err("Failed to create tables", e))?;
        Ok(())
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get(&self, key: StorageKey) -> StoreResult<Option<String>> {
        let conn = self.open()?;
        conn.query_row(
            "SELECT value FROM kv WHERE key = ?",
            params![key.as_str()],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| storage_err("Failed to read key", e))
    }

    fn set(&self, key: StorageKey, value: &str) -> StoreResult<()> {
        self.write_batch(&[(key, Some(value.to_string()))])
    }

    fn remove(&self, key: StorageKey) -> StoreResult<()> {
        self.write_batch(&[(key, None)])
    }

    fn write_batch(&self, entries: &[(StorageKey, Option<String>)]) -> StoreResult<()> {
        let mut conn = self.open()?;
        let now = Utc::now().to_rfc3339();

        let tx = conn
            .transaction()
            .map_err(|e| storage_err("Failed to start transaction", e))?;

        for (key, value) in entries {
            match value {
                Some(v) => {
                    tx.execute(
                        "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
                         ON CONFLICT(key) DO UPDATE SET
                            value = excluded.value,
                            updated_at = excluded.updated_at",
                        params![key.as_str(), v, now],
                    )
                    .map_err(|e| storage_err("Failed to write key", e))?;
                }
                None => {
                    tx.execute("DELETE FROM kv WHERE key = ?", params![key.as_str()])
                        .map_err(|e| storage_err("Failed to delete key", e))?;
                }
            }
        }

        tx.commit()
            .map_err(|e| storage_err("Failed to commit transaction", e))?;

        Ok(())
    }
}
