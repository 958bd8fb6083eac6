//! Configuration loading and database path resolution
//!
//! Bootstrap settings come from an optional TOML file:
//!
//! ```toml
//! database_path = "/var/lib/punocracy/punocracy.db"
//!
//! [logging]
//! level = "debug"
//!
//! [curation]
//! batch_size = 10
//! ```
//!
//! A missing file is not an error; every field has a built-in default.

use crate::curation::DEFAULT_BATCH_SIZE;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable that overrides the configured database path
pub const DATABASE_ENV_VAR: &str = "PUNOCRACY_DATABASE";

const APP_DIR: &str = "punocracy";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "punocracy.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub curation: CurationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Curator queue settings
#[derive(Debug, Clone, Deserialize)]
pub struct CurationConfig {
    /// Phrases handed to a curator per fetch
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_batch_size() -> u32 {
    DEFAULT_BATCH_SIZE
}

/// Locate the config file to read
///
/// An explicit path always wins, even if it does not exist. Otherwise the
/// per-user config directory is tried, then `/etc/punocracy/config.toml`.
pub fn config_file_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILE);
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Parse TOML configuration text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
}

/// Load configuration, falling back to defaults when no file is present
///
/// A file that exists but cannot be read or parsed is an error.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match config_file_path(explicit) {
        Some(path) => path,
        None => {
            warn!("No config file found, using defaults");
            return Ok(TomlConfig::default());
        }
    };

    if !path.exists() {
        warn!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let config = parse_toml_config(&content)?;

    if config.curation.batch_size == 0 {
        return Err(Error::Config("curation.batch_size must be at least 1".to_string()));
    }

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Database path resolution, highest priority first:
/// 1. Command-line argument
/// 2. `PUNOCRACY_DATABASE` environment variable
/// 3. TOML `database_path`
/// 4. OS-dependent default under the local data directory
pub fn resolve_database_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.database_path {
        return path.clone();
    }

    default_database_path()
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".").join(APP_DIR))
        .join(DATABASE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = parse_toml_config("").unwrap();
        assert!(config.database_path.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.curation.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_full_toml() {
        let config = parse_toml_config(
            r#"
            database_path = "/tmp/puns.db"

            [logging]
            level = "debug"

            [curation]
            batch_size = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/puns.db")));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.curation.batch_size, 12);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = parse_toml_config("database_path = [");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_default_database_path_file_name() {
        let path = default_database_path();
        assert!(path.ends_with("punocracy/punocracy.db"));
    }
}
