//! Domain-level error types for chat-exporter.
//!
//! All errors are typed with `thiserror`. Per-record problems never reach
//! this type: readers log and skip them. What remains are environment
//! failures, file I/O, and the distinct "nothing to export" outcome.

use std::path::PathBuf;
use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// The host operating system has no known Cursor data location.
    #[error("Unsupported OS: {os}")]
    UnsupportedPlatform { os: String },

    /// Storage root (or a file expected beneath it) does not exist.
    #[error("Chat storage not found at: {path}")]
    StorageRootNotFound { path: PathBuf },

    /// Failed to open or query a database.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid input given to the tool (bad format name, bad path, ...).
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// JSON parsing or serialization failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Extraction or filtering produced an empty result set.
    ///
    /// Not a failure of the tool itself; `main` reports it without the
    /// `Error:` prefix but still exits non-zero.
    #[error("{message}")]
    NoRecords {
        message: String,
        hint: Option<String>,
    },
}

impl AppError {
    /// Create a database error from rusqlite error.
    pub fn database(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create an empty-result error with an optional hint line.
    pub fn no_records(message: impl Into<String>, hint: Option<&str>) -> Self {
        Self::NoRecords {
            message: message.into(),
            hint: hint.map(str::to_string),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
