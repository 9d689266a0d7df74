use crate::cli::LogLevel;
use anyhow::{Context, Result};
use canopy_core::LifecycleOptions;
use canopy_sqlite::SqliteConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Log level when neither `--log-level` nor `--verbose` is given
    pub log_level: Option<String>,
    /// SQLite database settings
    pub database: SqliteConfig,
    /// Site settings used to resolve group templates
    pub site: SiteConfig,
    /// Category save behaviour
    pub categories: LifecycleOptions,
    /// User ID to granted permission keys, e.g. `"1" = ["editCategories:3"]`
    pub permissions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Root directory of the site templates
    pub templates_path: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            templates_path: PathBuf::from("templates"),
        }
    }
}

/// Values given on the command line, applied last
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub templates_path: Option<PathBuf>,
}

impl CliConfig {
    /// Load configuration with precedence: defaults < file < env < args
    pub fn load(config_file: Option<PathBuf>, overrides: Overrides) -> Result<Self> {
        let mut config = Self::from_file_or_default(config_file)?;

        config.apply_env(|key| std::env::var(key).ok());

        if let Some(path) = overrides.db_path {
            config.database.path = path;
        }
        if let Some(path) = overrides.templates_path {
            config.site.templates_path = path;
        }

        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("CANOPY_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(path) = var("CANOPY_TEMPLATES_PATH") {
            self.site.templates_path = PathBuf::from(path);
        }
        if let Some(level) = var("CANOPY_LOG_LEVEL") {
            self.log_level = Some(level);
        }
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("canopy");
        Ok(config_dir.join("config.toml"))
    }

    fn from_file_or_default(config_file: Option<PathBuf>) -> Result<Self> {
        let path = config_file
            .or_else(|| Self::default_config_path().ok())
            .filter(|p| p.exists());

        match path {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Configured log level, if it names a known level
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Display the current configuration as TOML
    pub fn display_as_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config as TOML")
    }
}
