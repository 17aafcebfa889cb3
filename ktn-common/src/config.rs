//! Configuration loading
//!
//! Configuration is resolved once at process start and never mutated:
//! 1. Command-line arguments (highest priority, with environment fallbacks)
//! 2. TOML config file
//! 3. Built-in defaults
//!
//! Binaries parse their flags with `clap` and pass them in as
//! [`ConfigOverrides`]; the merged [`AppConfig`] is then handed to every
//! component constructor.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Short delay between remote reads for narrow, frequent syncs
pub const GREEDY_REQUEST_DELAY: Duration = Duration::from_millis(50);

/// Longer delay between remote reads for bulk historical syncs
pub const SAFE_REQUEST_DELAY: Duration = Duration::from_millis(1200);

/// First year with an order spreadsheet
pub const DEFAULT_START_YEAR: i32 = 2018;

/// Delay profile applied before each remote read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestProfile {
    Greedy,
    Safe,
}

impl RequestProfile {
    pub fn delay(self) -> Duration {
        match self {
            RequestProfile::Greedy => GREEDY_REQUEST_DELAY,
            RequestProfile::Safe => SAFE_REQUEST_DELAY,
        }
    }
}

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Spreadsheet ids, one spreadsheet per year
    #[serde(default)]
    pub spreadsheet_ids: Vec<String>,

    /// A1 range read from every sheet (must start at row 1)
    #[serde(default = "default_sheet_parse_range")]
    pub sheet_parse_range: String,

    /// Google API key for the Sheets API
    #[serde(default)]
    pub sheets_api_key: Option<String>,

    /// OAuth access token for the Sheets API (used instead of the API key)
    #[serde(default)]
    pub sheets_access_token: Option<String>,

    #[serde(default)]
    pub telegram_token: Option<String>,

    #[serde(default)]
    pub telegram_chat_id: Option<i64>,

    /// HTTP port of the search service
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_start_year")]
    pub start_year: i32,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
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

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            spreadsheet_ids: Vec::new(),
            sheet_parse_range: default_sheet_parse_range(),
            sheets_api_key: None,
            sheets_access_token: None,
            telegram_token: None,
            telegram_chat_id: None,
            api_port: default_api_port(),
            start_year: default_start_year(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./ktn.db")
}

fn default_sheet_parse_range() -> String {
    "A1:AZ".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_start_year() -> i32 {
    DEFAULT_START_YEAR
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub spreadsheet_ids: Option<Vec<String>>,
    pub sheet_parse_range: Option<String>,
    pub sheets_api_key: Option<String>,
    pub sheets_access_token: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<i64>,
    pub api_port: Option<u16>,
    pub start_year: Option<i32>,
    pub log_level: Option<String>,
}

/// Immutable application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub spreadsheet_ids: Vec<String>,
    pub sheet_parse_range: String,
    pub sheets_api_key: Option<String>,
    pub sheets_access_token: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<i64>,
    pub api_port: u16,
    pub start_year: i32,
    pub log_level: String,
}

impl AppConfig {
    /// Merge overrides on top of the TOML configuration
    pub fn resolve(toml: TomlConfig, overrides: ConfigOverrides) -> Self {
        Self {
            database_path: overrides.database_path.unwrap_or(toml.database_path),
            spreadsheet_ids: overrides
                .spreadsheet_ids
                .filter(|ids| !ids.is_empty())
                .unwrap_or(toml.spreadsheet_ids)
                .into_iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
            sheet_parse_range: overrides
                .sheet_parse_range
                .unwrap_or(toml.sheet_parse_range),
            sheets_api_key: non_empty(overrides.sheets_api_key.or(toml.sheets_api_key)),
            sheets_access_token: non_empty(
                overrides.sheets_access_token.or(toml.sheets_access_token),
            ),
            telegram_token: non_empty(overrides.telegram_token.or(toml.telegram_token)),
            telegram_chat_id: overrides.telegram_chat_id.or(toml.telegram_chat_id),
            api_port: overrides.api_port.unwrap_or(toml.api_port),
            start_year: overrides.start_year.unwrap_or(toml.start_year),
            log_level: overrides.log_level.unwrap_or(toml.logging.level),
        }
    }

    /// Load the TOML file (if any) and merge overrides
    pub fn load(config_file: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let toml = load_toml_config(config_file)?;
        Ok(Self::resolve(toml, overrides))
    }

    /// Validate settings required for remote reads
    pub fn require_remote_access(&self) -> Result<()> {
        if self.spreadsheet_ids.is_empty() {
            return Err(Error::Config(
                "No spreadsheet ids configured (spreadsheet_ids / KTN_SPREADSHEET_IDS)".to_string(),
            ));
        }
        if self.sheets_api_key.is_none() && self.sheets_access_token.is_none() {
            return Err(Error::Config(
                "Sheets API credentials not configured (sheets_api_key or sheets_access_token)"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Load TOML configuration.
///
/// An explicit path must exist. Without one, the platform config file
/// (`~/.config/ktn/config.toml` on Linux) is used when present, otherwise
/// built-in defaults.
pub fn load_toml_config(config_file: Option<&Path>) -> Result<TomlConfig> {
    let path = match config_file {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => path,
            None => {
                debug!("No config file found, using built-in defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Platform config file location
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ktn").join("config.toml"))
}
