//! Configuration for issuelog.
//!
//! Chooses the slot backend, toggles global capture, and overrides the
//! capturing context stamped on entries. Layered with figment: defaults, then
//! the TOML file, then `ISSUELOG_*` variables (`__` separates nesting, e.g.
//! `ISSUELOG_STORAGE__BACKEND=file`).

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const CONFIG_FILE_NAME: &str = "config.toml";
const DATA_DIR_NAME: &str = "issuelog";
const DATABASE_FILE_NAME: &str = "slots.db";
const SLOTS_DIR_NAME: &str = "slots";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ISSUELOG_`)
/// 2. TOML config file at `~/.config/issuelog/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Durable storage configuration.
    pub storage: StorageConfig,
    /// Global capture configuration.
    pub capture: CaptureConfig,
    /// Capturing-context overrides.
    pub environment: EnvironmentConfig,
    /// Viewer configuration.
    pub viewer: ViewerConfig,
}

/// Which durable storage backend holds the log slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// `SQLite` database with one row per slot.
    #[default]
    Sqlite,
    /// One JSON file per slot.
    File,
    /// In-process only; nothing survives a restart.
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend holding the slots.
    pub backend: StorageBackend,
    /// Path to the database file for the `sqlite` backend.
    /// Defaults to `~/.local/share/issuelog/slots.db`
    pub database_path: Option<PathBuf>,
    /// Directory for the `file` backend.
    /// Defaults to `~/.local/share/issuelog/slots`
    pub directory: Option<PathBuf>,
}

/// Global capture configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Record panics in the general log.
    pub panics: bool,
    /// Record failed background tasks in the general log.
    pub rejections: bool,
}

/// Overrides for the capturing context stamped on entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Location identifier to record instead of the working directory.
    pub location: Option<String>,
    /// Agent string to record instead of the built-in one.
    pub agent: Option<String>,
}

/// Viewer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Tint entries by severity using ANSI colors.
    pub color: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            panics: true,
            rejections: true,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

impl Config {
    /// Load from the default file location.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load with `config_path` in place of the default file, if given.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result is invalid.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(&file))
            .merge(Env::prefixed("ISSUELOG_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/issuelog/config.toml`.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// `<local data dir>/issuelog`, home of the default slot backends.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Reject overrides that are set but empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        let blank_text = |value: &Option<String>| value.as_deref().is_some_and(|v| v.trim().is_empty());
        let blank_path =
            |value: &Option<PathBuf>| value.as_ref().is_some_and(|p| p.as_os_str().is_empty());

        let offending = [
            ("environment.location", blank_text(&self.environment.location)),
            ("environment.agent", blank_text(&self.environment.agent)),
            ("storage.database_path", blank_path(&self.storage.database_path)),
            ("storage.directory", blank_path(&self.storage.directory)),
        ]
        .into_iter()
        .find_map(|(key, blank)| blank.then_some(key));

        match offending {
            Some(key) => Err(Error::ConfigValidation {
                message: format!("{key} cannot be empty when set"),
            }),
            None => Ok(()),
        }
    }

    /// SQLite backend file, defaulting under [`Config::default_data_dir`].
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// File backend directory, defaulting under [`Config::default_data_dir`].
    #[must_use]
    pub fn slots_directory(&self) -> PathBuf {
        self.storage
            .directory
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(SLOTS_DIR_NAME))
    }
}
