//! Error types for issuelog.
//!
//! The stores never surface these to their callers: a failed read or write of
//! a durable slot is reported on the diagnostic channel and swallowed. They do
//! surface from opening a storage backend, from loading configuration, and
//! from the clipboard, where the caller decides what to do.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the slot backends, configuration, and clipboard.
#[derive(Error, Debug)]
pub enum Error {
    /// The slot database could not be opened or created.
    #[error("cannot open slot database {path}: {source}")]
    DatabaseOpen {
        /// Database file.
        path: PathBuf,
        /// Cause.
        #[source]
        source: rusqlite::Error,
    },

    /// A statement against the slot database failed.
    #[error("slot database statement failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// The slot database schema could not be brought up to date.
    #[error("slot database schema upgrade failed: {message}")]
    DatabaseMigration {
        /// What went wrong.
        message: String,
    },

    /// A slot was refused by its backend.
    #[error("slot '{key}' unavailable: {message}")]
    SlotUnavailable {
        /// Slot key.
        key: String,
        /// What went wrong.
        message: String,
    },

    /// The slot directory (or the database's parent) could not be created.
    #[error("cannot create {path}: {source}")]
    DirectoryCreate {
        /// Directory that could not be created.
        path: PathBuf,
        /// Cause.
        #[source]
        source: std::io::Error,
    },

    /// Reading or replacing a slot file failed.
    #[error("slot file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Entries could not be encoded or decoded.
    #[error("malformed entry JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration sources could not be merged.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration loaded but holds an unusable value.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Which value is unusable.
        message: String,
    },

    /// The system clipboard refused the summary.
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Clipboard failure with a backend message.
    #[must_use]
    pub fn clipboard(message: impl Into<String>) -> Self {
        Self::Clipboard(message.into())
    }

    /// Slot refusal for `key`.
    #[must_use]
    pub fn slot_unavailable(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SlotUnavailable {
            key: key.into(),
            message: message.into(),
        }
    }

    /// True for failures raised by a slot backend.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::DatabaseOpen { .. }
                | Self::DatabaseQuery(_)
                | Self::DatabaseMigration { .. }
                | Self::SlotUnavailable { .. }
                | Self::DirectoryCreate { .. }
                | Self::Io(_)
        )
    }
}
