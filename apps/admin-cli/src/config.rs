//! # Admin Configuration
//!
//! Configuration for the `tally-admin` CLI.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command-line flags (highest priority, applied by main)             │
//! │     --db ./other.db                                                    │
//! │                                                                         │
//! │  2. Environment Variables                                              │
//! │     TALLY_DB_PATH=/var/lib/tally/tally.db                              │
//! │     TALLY_LOG=debug                                                    │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     ~/.config/tally-pos/admin.toml (Linux)                             │
//! │     ~/Library/Application Support/com.tally.pos/admin.toml (macOS)     │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # admin.toml
//! [database]
//! path = "/var/lib/tally/tally.db"
//! max_connections = 5
//!
//! [logging]
//! filter = "info,sqlx=warn"
//!
//! [tax]
//! tie_break = "first_listed"  # first_listed | lowest_id
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tally_core::TieBreak;
use tally_db::DbConfig;

// =============================================================================
// Errors
// =============================================================================

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

/// Where the store lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "tally", "pos")
        .map(|dirs| dirs.data_dir().join("tally.db"))
        .unwrap_or_else(|| PathBuf::from("./tally.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Log output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "warn".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
        }
    }
}

/// Tax resolution policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxSettings {
    /// Which rule wins when matching rules share the top priority.
    #[serde(default)]
    pub tie_break: TieBreak,
}

// =============================================================================
// Admin Configuration
// =============================================================================

/// Complete admin CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub tax: TaxSettings,

    /// The file this configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl AdminConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (admin.toml); an explicit path must exist
    /// 3. Environment variables
    ///
    /// Nothing is logged here since this runs before the subscriber exists;
    /// the caller reports [`AdminConfig::source`] once logging is up.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let explicit = config_path.is_some();
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() || explicit {
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
                config.source = Some(path);
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document; missing sections keep their defaults.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `TALLY_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("TALLY_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Some(raw) = lookup("TALLY_MAX_CONNECTIONS") {
            self.database.max_connections =
                raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "TALLY_MAX_CONNECTIONS".to_string(),
                    value: raw.clone(),
                })?;
        }

        if let Some(filter) = lookup("TALLY_LOG") {
            self.logging.filter = filter;
        }

        if let Some(raw) = lookup("TALLY_TIE_BREAK") {
            self.tax.tie_break = match raw.to_lowercase().as_str() {
                "first_listed" | "first" => TieBreak::FirstListed,
                "lowest_id" | "id" => TieBreak::LowestId,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "TALLY_TIE_BREAK".to_string(),
                        value: raw,
                    })
                }
            };
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Builds the store configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "pos")
            .map(|dirs| dirs.config_dir().join("admin.toml"))
    }
}
