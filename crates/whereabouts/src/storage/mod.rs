//! Storage layer for whereabouts.
//!
//! Host local storage is modelled as a string key-value store
//! ([`KeyValueStore`]). [`LocationStore`] keeps captured locations in it as a
//! single JSON list under a fixed key, exactly the way a page would use
//! browser local storage.

pub mod locations;
pub mod migrations;
pub mod schema;
mod sqlite;

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};

pub use locations::{ExportArtifact, LocationStore, StoreStats, StoredLocationEntry};
pub use sqlite::SqliteKeyValue;

/// A string key-value store standing in for host local storage.
///
/// Each call is atomic on its own; nothing groups a `get` and a later `set`.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<()>;

    /// Approximate on-disk size in bytes; zero for ephemeral backends.
    fn size_bytes(&self) -> u64 {
        0
    }
}

/// Ephemeral in-process key-value store.
#[derive(Debug, Default)]
pub struct MemoryKeyValue {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValue {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| Error::StorageUnavailable(e.to_string()))
    }
}

impl KeyValueStore for MemoryKeyValue {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
