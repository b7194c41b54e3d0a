//! Durable slot storage for issuelog.
//!
//! Each log store mirrors its entries into one string-keyed slot holding the
//! JSON-serialized sequence. Stores depend on the [`SlotStorage`] capability
//! rather than on a concrete backend, so tests can substitute a failing or
//! corrupt implementation.

mod file;
pub mod migrations;
pub mod schema;
mod sqlite;

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::config::{Config, StorageBackend};
use crate::error::Result;

pub use file::FileStorage;
pub use sqlite::SqliteStorage;

/// String-keyed durable storage for serialized log sequences.
pub trait SlotStorage: Debug + Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Read a slot. Returns `None` if the slot has never been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace the contents of a slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// In-process slot storage.
///
/// Contents live as long as the value (and its clones) do.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots that have been written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if no slot has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SlotStorage for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Open the backend selected in configuration.
///
/// # Errors
///
/// Returns an error if the backend cannot be created (directory or database
/// creation failure).
pub fn open_configured(config: &Config) -> Result<Arc<dyn SlotStorage>> {
    let storage: Arc<dyn SlotStorage> = match config.storage.backend {
        StorageBackend::Sqlite => Arc::new(SqliteStorage::open(config.database_path())?),
        StorageBackend::File => Arc::new(FileStorage::open(config.slots_directory())?),
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
    };
    info!("Using {} slot storage", storage.name());
    Ok(storage)
}
