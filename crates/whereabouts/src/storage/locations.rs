//! The persisted list of captured locations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{KeyValueStore, MemoryKeyValue};
use crate::error::{Error, Result};
use crate::location::LocationRecord;

/// Storage key holding the JSON list of entries.
pub const LOCATIONS_KEY: &str = "whereabouts.locations";

/// Storage key holding the session id.
pub const SESSION_KEY: &str = "whereabouts.session_id";

/// A location record as persisted, tagged with capture and session ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLocationEntry {
    /// The captured record.
    #[serde(flatten)]
    pub record: LocationRecord,
    /// Identifier of this capture.
    pub capture_id: String,
    /// Session this capture belongs to.
    pub session_id: String,
}

/// A downloadable snapshot of the stored list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Suggested file name, `location-data-YYYY-MM-DD.json`.
    pub file_name: String,
    /// Pretty-printed JSON of every stored entry.
    pub contents: String,
}

impl ExportArtifact {
    /// Write the artifact into `dir`, returning the full path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file written.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.contents)?;
        Ok(path)
    }
}

/// Statistics about the stored list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of stored entries.
    pub entry_count: usize,
    /// Current session id, if one has been created.
    pub session_id: Option<String>,
    /// Timestamp of the oldest capture.
    pub oldest_capture: Option<DateTime<Utc>>,
    /// Timestamp of the newest capture.
    pub newest_capture: Option<DateTime<Utc>>,
    /// Size of the backing store in bytes.
    pub backend_size_bytes: u64,
}

/// Append-only list of captured locations in local storage.
///
/// Constructed once and shared by cloning; clones see the same backend.
///
/// `save` is a plain read-modify-write with no lock spanning it. Two saves
/// interleaving between their read and their write lose one entry, the same
/// as two pages writing the same local storage key.
#[derive(Debug, Clone)]
pub struct LocationStore {
    backend: Arc<dyn KeyValueStore>,
}

impl LocationStore {
    /// Create a store over the given backend.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Create a store backed by process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyValue::new()))
    }

    /// Get the session id, creating and persisting one on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or written.
    pub fn session_id(&self) -> Result<String> {
        if let Some(existing) = self.backend.get(SESSION_KEY)? {
            return Ok(existing);
        }
        let session_id = generate_id("session");
        self.backend.set(SESSION_KEY, &session_id)?;
        debug!(session_id = %session_id, "Created new session");
        Ok(session_id)
    }

    /// Get the session id without creating one.
    #[must_use]
    pub fn current_session_id(&self) -> Option<String> {
        self.backend.get(SESSION_KEY).ok().flatten()
    }

    /// Append a record to the stored list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be read or written back. Malformed
    /// stored data is not an error; it is replaced.
    pub fn save(&self, record: LocationRecord) -> Result<StoredLocationEntry> {
        let mut entries = self.load_entries()?;
        let entry = StoredLocationEntry {
            record,
            capture_id: generate_id("capture"),
            session_id: self.session_id()?,
        };
        entries.push(entry.clone());

        let json = serde_json::to_string(&entries)?;
        self.backend.set(LOCATIONS_KEY, &json)?;

        debug!(
            capture_id = %entry.capture_id,
            total = entries.len(),
            "Saved location"
        );
        Ok(entry)
    }

    /// Every stored entry in capture order.
    ///
    /// Missing, unreadable, or malformed data yields an empty list.
    #[must_use]
    pub fn get_all(&self) -> Vec<StoredLocationEntry> {
        self.load_entries().unwrap_or_else(|e| {
            warn!("Failed to read stored locations: {e}");
            Vec::new()
        })
    }

    /// Read the stored list. Only malformed JSON counts as empty; backend
    /// failures are returned so a save never overwrites history it could
    /// not read.
    fn load_entries(&self) -> Result<Vec<StoredLocationEntry>> {
        let Some(raw) = self.backend.get(LOCATIONS_KEY)? else {
            return Ok(Vec::new());
        };

        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Stored locations are malformed, treating as empty: {e}");
            Vec::new()
        }))
    }

    /// Discard the stored list and the session id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    pub fn clear(&self) -> Result<()> {
        self.backend.remove(LOCATIONS_KEY)?;
        self.backend.remove(SESSION_KEY)?;
        info!("Cleared stored locations");
        Ok(())
    }

    /// Snapshot the stored list as an export artifact dated today (UTC).
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be serialized.
    pub fn export(&self) -> Result<ExportArtifact> {
        self.export_dated(Utc::now().date_naive())
    }

    /// Snapshot the stored list as an export artifact for `date`.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be serialized.
    pub fn export_dated(&self, date: NaiveDate) -> Result<ExportArtifact> {
        let entries = self.get_all();
        Ok(ExportArtifact {
            file_name: format!("location-data-{}.json", date.format("%Y-%m-%d")),
            contents: serde_json::to_string_pretty(&entries)?,
        })
    }

    /// Export and write the artifact into `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = self.export()?.write_to(dir)?;
        info!("Exported locations to {}", path.display());
        Ok(path)
    }

    /// Summarize what is stored.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let entries = self.get_all();
        let times: Vec<DateTime<Utc>> = entries
            .iter()
            .filter_map(|e| e.record.captured_at())
            .collect();

        StoreStats {
            entry_count: entries.len(),
            session_id: self.current_session_id(),
            oldest_capture: times.iter().min().copied(),
            newest_capture: times.iter().max().copied(),
            backend_size_bytes: self.backend.size_bytes(),
        }
    }
}

/// `<prefix>_<epoch-ms>_<9 random hex chars>`.
fn generate_id(prefix: &str) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}_{}", Utc::now().timestamp_millis(), &random[..9])
}
