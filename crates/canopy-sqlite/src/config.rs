//! SQLite connection configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the database lives and how the connection is tuned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file, or `:memory:`
    pub path: PathBuf,
    /// Write-ahead logging; ignored for in-memory databases
    pub wal_mode: bool,
    pub foreign_keys: bool,
    pub busy_timeout_ms: u32,
    /// Page cache size as passed to `PRAGMA cache_size` (negative = KiB)
    pub cache_size: i64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("canopy.db"),
            wal_mode: true,
            foreign_keys: true,
            busy_timeout_ms: 5000,
            cache_size: -16000,
        }
    }
}

impl SqliteConfig {
    /// File-backed configuration with default tuning
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// In-memory database, mainly for tests
    pub fn memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            wal_mode: false,
            ..Self::default()
        }
    }

    pub fn is_memory(&self) -> bool {
        self.path.to_str() == Some(":memory:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_config() {
        let config = SqliteConfig::memory();
        assert!(config.is_memory());
        assert!(!config.wal_mode);
        assert!(config.foreign_keys);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SqliteConfig =
            serde_json::from_str(r#"{"path": "/tmp/site.db", "busy_timeout_ms": 250}"#).unwrap();

        assert_eq!(config.path, PathBuf::from("/tmp/site.db"));
        assert_eq!(config.busy_timeout_ms, 250);
        assert!(config.wal_mode);
        assert!(!config.is_memory());
    }
}
