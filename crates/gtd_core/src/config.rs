//! Application configuration.
//!
//! # Responsibility
//! - Load `config.toml` and fill in platform defaults for missing keys.
//! - Resolve the database file and log directory from the data directory.
//!
//! # Invariants
//! - Returned configs have an absolute `data_dir`.
//! - `log_level` is one of `trace|debug|info|warn|error`.
//! - `search_limit` is within `1..=MAX_SEARCH_LIMIT`.

use crate::logging::LogLevel;
use crate::search::fts::DEFAULT_SEARCH_LIMIT;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "gtd";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "gtd.sqlite3";
const LOG_DIR_NAME: &str = "logs";
pub const MAX_SEARCH_LIMIT: u32 = 500;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot access `{}`: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "invalid config file `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid configuration: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the database and, by default, the logs.
    pub data_dir: PathBuf,
    pub log_level: String,
    /// Overrides `<data_dir>/logs`.
    pub log_dir: Option<PathBuf>,
    /// Default hit limit for `gtd search`.
    pub search_limit: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: LogLevel::build_default().as_str().to_string(),
            log_dir: None,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl AppConfig {
    /// Loads and validates one config file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.normalized()
    }

    /// Loads `path` when given, else the platform config file when it
    /// exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(path),
            _ => Self::default().normalized(),
        }
    }

    fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Validates values and resolves relative paths against the current
    /// working directory.
    pub fn normalized(mut self) -> ConfigResult<Self> {
        self.log_level = LogLevel::parse(&self.log_level)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?
            .as_str()
            .to_string();
        if self.search_limit == 0 || self.search_limit > MAX_SEARCH_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "search_limit must be within 1..={MAX_SEARCH_LIMIT}, got {}",
                self.search_limit
            )));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir cannot be empty".to_string()));
        }
        self.data_dir = absolutize(self.data_dir)?;
        self.log_dir = self.log_dir.map(absolutize).transpose()?;
        Ok(self)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn resolved_log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(LOG_DIR_NAME))
    }

    /// Creates the data directory if needed.
    pub fn ensure_data_dir(&self) -> ConfigResult<()> {
        std::fs::create_dir_all(&self.data_dir).map_err(|source| ConfigError::Io {
            path: self.data_dir.clone(),
            source,
        })
    }
}

/// `<platform config dir>/gtd/config.toml`, when the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join(APP_DIR_NAME)
}

fn absolutize(path: PathBuf) -> ConfigResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
        path: PathBuf::from("."),
        source,
    })?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError};
    use std::path::PathBuf;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = AppConfig::parse("log_level = \"WARNING\"")
            .unwrap()
            .normalized()
            .unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.search_limit, 20);
        assert!(config.data_dir.is_absolute());
    }

    #[test]
    fn relative_data_dir_is_resolved() {
        let config = AppConfig::parse("data_dir = \"organizer\"")
            .unwrap()
            .normalized()
            .unwrap();
        assert!(config.data_dir.is_absolute());
        assert!(config.data_dir.ends_with("organizer"));
        assert_eq!(config.db_path().file_name().unwrap(), "gtd.sqlite3");
        assert!(config.resolved_log_dir().ends_with("organizer/logs"));
    }

    #[test]
    fn out_of_range_search_limit_is_rejected() {
        let err = AppConfig::parse("search_limit = 0")
            .unwrap()
            .normalized()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn explicit_log_dir_wins() {
        let config = AppConfig {
            log_dir: Some(PathBuf::from("/var/log/gtd")),
            ..AppConfig::default()
        };
        assert_eq!(config.resolved_log_dir(), PathBuf::from("/var/log/gtd"));
    }
}
