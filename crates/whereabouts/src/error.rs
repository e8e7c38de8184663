//! Error types for whereabouts.
//!
//! Two families live here. [`Error`] covers the crate's own machinery (storage,
//! configuration, I/O, serialization). [`LocationError`] is the classification a
//! caller receives when a location request fails; it mirrors the host's
//! geolocation error codes.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for whereabouts operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// The storage backend lock was poisoned by a panicking writer.
    #[error("storage backend unavailable: {0}")]
    StorageUnavailable(String),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for whereabouts operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if this error came from persisting or reading stored data.
    ///
    /// These are the failures the capture path swallows.
    #[must_use]
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Self::DatabaseOpen { .. }
                | Self::DatabaseQuery(_)
                | Self::DatabaseMigration { .. }
                | Self::StorageUnavailable(_)
                | Self::Json(_)
        )
    }
}

/// Why a location request failed.
///
/// The numeric codes follow the host geolocation convention:
/// `1` permission denied, `2` position unavailable, `3` timeout.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationError {
    /// The host exposes no geolocation capability at all.
    #[error("geolocation is not supported by this host")]
    UnsupportedCapability,

    /// The user or policy refused location access.
    #[error("location permission denied")]
    PermissionDenied,

    /// The host could not determine a position.
    #[error("location information is unavailable")]
    PositionUnavailable,

    /// The host did not produce a fix within the requested timeout.
    #[error("location request timed out")]
    Timeout,

    /// The host reported a code outside the known set.
    #[error("unknown location error (code {code})")]
    Unknown {
        /// The raw host error code.
        code: u16,
    },
}

impl LocationError {
    /// Host code for a denied permission.
    pub const PERMISSION_DENIED: u16 = 1;
    /// Host code for an unavailable position.
    pub const POSITION_UNAVAILABLE: u16 = 2;
    /// Host code for a timed-out request.
    pub const TIMEOUT: u16 = 3;

    /// Classify a raw host error code.
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        match code {
            Self::PERMISSION_DENIED => Self::PermissionDenied,
            Self::POSITION_UNAVAILABLE => Self::PositionUnavailable,
            Self::TIMEOUT => Self::Timeout,
            code => Self::Unknown { code },
        }
    }

    /// Stable snake_case name, used in logs and JSON output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedCapability => "unsupported_capability",
            Self::PermissionDenied => "permission_denied",
            Self::PositionUnavailable => "position_unavailable",
            Self::Timeout => "timeout",
            Self::Unknown { .. } => "unknown",
        }
    }
}
