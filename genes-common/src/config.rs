//! Configuration loading and store path resolution
//!
//! Bootstrap settings come from a small TOML file. Every value can be
//! overridden, in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the store file
pub const DATABASE_ENV_VAR: &str = "GENES_DATABASE";

/// File name of the bootstrap TOML inside the config directory
const CONFIG_FILE_NAME: &str = "genes.toml";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite store shared with the register web application
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Field rewrite pipeline settings (optional)
    #[serde(default)]
    pub rewrite: RewriteToml,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

fn default_log_level() -> String {
    "info".to_string()
}

/// `[rewrite]` table: every key is optional, unset keys fall back to
/// command-line values or built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewriteToml {
    pub model: Option<String>,
    pub batch_size: Option<usize>,
    pub delay_secs: Option<f64>,
    pub max_attempts: Option<u32>,
    pub base_backoff_ms: Option<u64>,
    pub max_tokens: Option<u32>,
    pub warning_log: Option<PathBuf>,
    pub category_keywords: Option<Vec<String>>,
    /// Lowest-priority credential source (flag and environment win)
    pub api_key: Option<String>,
}

/// Default location of the bootstrap file (`~/.config/genes/genes.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("genes").join(CONFIG_FILE_NAME))
}

/// Load the bootstrap TOML.
///
/// An explicit path must exist. When no path is given the platform default
/// is tried, and a missing default file yields built-in defaults.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            Some(path) => {
                debug!("No config file at {}, using defaults", path.display());
                return Ok(TomlConfig::default());
            }
            None => {
                debug!("Could not determine config directory, using defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config = parse_toml_config(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Parse bootstrap TOML text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Resolve the store path: CLI → `GENES_DATABASE` → TOML → compiled default
pub fn resolve_database_path(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.database_path {
        return path.clone();
    }

    default_database_path()
}

/// OS-dependent default store location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("genes").join("genes.db"))
        .unwrap_or_else(|| PathBuf::from("./genes_data/genes.db"))
}
