// Configuration loading and parsing (config/draft.toml).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub draft: DraftConfig,
    pub database: DatabaseConfig,
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftConfig {
    /// Number of snake rounds the draft runs.
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    /// Seconds between auto-pick evaluations.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
    /// Path to the static item list the catalog is seeded from.
    pub item_list: String,
    /// Whether registrations must carry a 3-character team abbreviation.
    #[serde(default = "default_true")]
    pub team_abbreviations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Channel reference pick announcements are broadcast to.
    pub channel: String,
}

fn default_rounds() -> u32 {
    11
}

fn default_tick_seconds() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/draft.toml` relative to the
/// given base directory.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("draft.toml");
    let text = std::fs::read_to_string(&path)
        .map_err(|_| ConfigError::FileNotFound { path: path.clone() })?;
    let config = parse_config(&text, &path)?;
    validate(&config)?;
    Ok(config)
}

/// Load configuration from the current working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    load_config_from(&cwd)
}

fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.draft.rounds == 0 {
        return Err(ConfigError::ValidationError {
            field: "draft.rounds".to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    if config.draft.tick_seconds == 0 {
        return Err(ConfigError::ValidationError {
            field: "draft.tick_seconds".to_string(),
            message: "must be at least 1 second".to_string(),
        });
    }
    if config.draft.item_list.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "draft.item_list".to_string(),
            message: "must point at an item list file".to_string(),
        });
    }
    if config.database.path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}
