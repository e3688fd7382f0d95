//! Database connection management
//!
//! Opens and configures SQLite connections from a `StoreConfig`.

use crate::errors::{config_error, from_rusqlite, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// SQLite journal mode, applied to file databases only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    #[default]
    Wal,
    Off,
}

impl JournalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        }
    }
}

/// Connection settings
///
/// ```toml
/// path = "tether.db"
/// journal_mode = "wal"
/// busy_timeout_ms = 5000
/// ```
///
/// A missing `path` means an in-memory database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
    pub journal_mode: JournalMode,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            journal_mode: JournalMode::default(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the document is malformed or has unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| config_error(format!("invalid store config: {}", e)))
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the file cannot be read or parsed.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            config_error(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}

/// Open and configure a connection for `config`
///
/// # Errors
///
/// `StorageUnavailable` if the database cannot be opened.
pub fn open(config: &StoreConfig) -> Result<Connection> {
    let conn = match &config.path {
        Some(path) => Connection::open(path),
        None => Connection::open_in_memory(),
    }
    .map_err(|e| from_rusqlite("", "open", e))?;
    configure(&conn, config)?;
    Ok(conn)
}

/// Open a configured in-memory database
///
/// # Errors
///
/// `Persistence` if configuration fails.
pub fn open_in_memory() -> Result<Connection> {
    open(&StoreConfig::in_memory())
}

/// Apply connection settings
///
/// # Errors
///
/// Any pragma failure.
pub fn configure(conn: &Connection, config: &StoreConfig) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)
        .map_err(|e| from_rusqlite("", "configure", e))?;

    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|e| from_rusqlite("", "configure", e))?;

    // In-memory databases always use the MEMORY journal
    if config.path.is_some() {
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", config.journal_mode.as_str(), |row| {
                row.get(0)
            })
            .map_err(|e| from_rusqlite("", "configure", e))?;
        tracing::debug!(journal_mode = mode.as_str(), "configured journal mode");
    }

    Ok(())
}
