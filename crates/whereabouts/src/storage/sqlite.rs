//! `SQLite`-backed key-value store.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, trace};

use super::{migrations, KeyValueStore};
use crate::error::{Error, Result};

/// Persistent local storage in a `SQLite` database.
#[derive(Debug)]
pub struct SqliteKeyValue {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl SqliteKeyValue {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::StorageUnavailable(e.to_string()))
    }
}

impl KeyValueStore for SqliteKeyValue {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()?
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn()?.execute(
            r"
            INSERT INTO local_storage (key, value, created_at, updated_at)
            VALUES (?1, ?2, datetime('now'), datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value],
        )?;
        trace!(key, len = value.len(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let affected = self
            .conn()?
            .execute("DELETE FROM local_storage WHERE key = ?1", [key])?;
        trace!(key, affected, "Removed value");
        Ok(())
    }

    /// Database file plus its write-ahead log.
    fn size_bytes(&self) -> u64 {
        if self.path.to_string_lossy() == ":memory:" {
            return 0;
        }
        let mut wal = self.path.clone().into_os_string();
        wal.push("-wal");
        [self.path.as_path(), Path::new(&wal)]
            .iter()
            .filter_map(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("whereabouts_{name}_{}.db", std::process::id()))
    }

    fn cleanup(path: &Path) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(path.with_extension("db-wal"));
        let _ = std::fs::remove_file(path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_in_memory() {
        let store = SqliteKeyValue::open_in_memory().unwrap();
        assert_eq!(store.path().to_string_lossy(), ":memory:");
        assert_eq!(store.size_bytes(), 0);
    }

    #[test]
    fn test_set_get_overwrite() {
        let store = SqliteKeyValue::open_in_memory().unwrap();
        assert_eq!(store.get("key").unwrap(), None);

        store.set("key", "first").unwrap();
        store.set("key", "second").unwrap();
        assert_eq!(store.get("key").unwrap(), Some("second".to_string()));
    }

    #[test]
    fn test_overwrite_keeps_created_at() {
        let store = SqliteKeyValue::open_in_memory().unwrap();
        store.set("key", "first").unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "UPDATE local_storage SET created_at = '2000-01-01 00:00:00' WHERE key = 'key'",
                [],
            )
            .unwrap();
        store.set("key", "second").unwrap();

        let created_at: String = store
            .conn()
            .unwrap()
            .query_row(
                "SELECT created_at FROM local_storage WHERE key = 'key'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(created_at, "2000-01-01 00:00:00");
    }

    #[test]
    fn test_remove() {
        let store = SqliteKeyValue::open_in_memory().unwrap();
        store.set("key", "value").unwrap();
        store.remove("key").unwrap();
        assert_eq!(store.get("key").unwrap(), None);

        // Removing twice is fine
        store.remove("key").unwrap();
    }

    #[test]
    fn test_unicode_value() {
        let store = SqliteKeyValue::open_in_memory().unwrap();
        store.set("greeting", "Hello 世界 🌍").unwrap();
        assert_eq!(
            store.get("greeting").unwrap(),
            Some("Hello 世界 🌍".to_string())
        );
    }

    #[test]
    fn test_file_persists_across_reopen() {
        let path = temp_db("kv_reopen");
        cleanup(&path);

        {
            let store = SqliteKeyValue::open(&path).unwrap();
            store.set("whereabouts.session_id", "session_1").unwrap();
            assert!(store.size_bytes() > 0);
        }

        let store = SqliteKeyValue::open(&path).unwrap();
        assert_eq!(
            store.get("whereabouts.session_id").unwrap(),
            Some("session_1".to_string())
        );
        assert_eq!(store.path(), path);

        drop(store);
        cleanup(&path);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let root = std::env::temp_dir().join(format!("whereabouts_nested_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let nested_path = root.join("nested").join("storage.db");

        let store = SqliteKeyValue::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(store);
        let _ = std::fs::remove_dir_all(&root);
    }
}
