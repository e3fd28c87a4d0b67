//! Configuration for the fake role core
//!
//! Values come from defaults, a TOML file, or `FAKEROLE_*` environment
//! variables, and are validated before use.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

mod error;

pub use error::ConfigError;

use crate::logging::{LogConfig, LogLevel};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage backend configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which storage backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Sqlite,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "sqlite" => Ok(BackendKind::Sqlite),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection
    pub backend: BackendKind,

    /// SQLite database file (sqlite backend only)
    pub database_path: PathBuf,

    /// Maximum pooled SQLite connections
    pub max_pool_size: u32,

    /// How long to wait for a pooled connection
    #[serde(with = "humantime_serde")]
    pub connection_timeout: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            database_path: PathBuf::from("./data/fakeroles.db"),
            max_pool_size: 4,
            connection_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Convert to the logging subsystem's configuration
    pub fn to_log_config(&self) -> Result<LogConfig, ConfigError> {
        let level = self
            .level
            .parse::<LogLevel>()
            .map_err(|reason| ConfigError::InvalidValue { key: "logging.level", reason })?;

        Ok(LogConfig::new(level)
            .with_timestamp(self.with_timestamp)
            .with_target(self.with_target)
            .json_format(self.json_format))
    }
}

fn parse_var<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue { key, reason: e.to_string() })
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: FAKEROLE_<SECTION>_<KEY>
    /// Example: FAKEROLE_STORAGE_BACKEND=sqlite
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `FAKEROLE_*` environment variables onto this configuration
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(backend) = env::var("FAKEROLE_STORAGE_BACKEND") {
            self.storage.backend = parse_var("FAKEROLE_STORAGE_BACKEND", backend)?;
        }
        if let Ok(path) = env::var("FAKEROLE_STORAGE_DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Ok(size) = env::var("FAKEROLE_STORAGE_MAX_POOL_SIZE") {
            self.storage.max_pool_size = parse_var("FAKEROLE_STORAGE_MAX_POOL_SIZE", size)?;
        }

        if let Ok(level) = env::var("FAKEROLE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(json) = env::var("FAKEROLE_LOG_JSON") {
            self.logging.json_format = parse_var("FAKEROLE_LOG_JSON", json)?;
        }

        Ok(())
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.max_pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_pool_size must be greater than 0".to_string(),
            ));
        }

        if self.storage.backend == BackendKind::Sqlite
            && self.storage.database_path.as_os_str().is_empty()
        {
            return Err(ConfigError::ValidationFailed(
                "sqlite backend requires a database_path".to_string(),
            ));
        }

        if self.logging.level.parse::<LogLevel>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.backend, BackendKind::Memory);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.storage.max_pool_size = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.storage.backend = BackendKind::Sqlite;
        config.storage.database_path = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_validation() {
        let mut config = Config::default();

        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            backend = "sqlite"
            database_path = "/tmp/roles.db"
            connection_timeout = "5s"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, BackendKind::Sqlite);
        assert_eq!(config.storage.connection_timeout, Duration::from_secs(5));
        assert_eq!(config.storage.max_pool_size, 4);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fakerole.toml");

        let mut config = Config::default();
        config.storage.backend = BackendKind::Sqlite;
        config.logging.json_format = true;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.storage.backend, BackendKind::Sqlite);
        assert!(loaded.logging.json_format);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/fakerole.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError(_)));
    }

    const ENV_KEYS: [&str; 5] = [
        "FAKEROLE_STORAGE_BACKEND",
        "FAKEROLE_STORAGE_DATABASE_PATH",
        "FAKEROLE_STORAGE_MAX_POOL_SIZE",
        "FAKEROLE_LOG_LEVEL",
        "FAKEROLE_LOG_JSON",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            env::remove_var(key);
        }
    }

    // The variables are process-wide, so both override paths run in one test
    #[test]
    fn test_env_overrides() {
        clear_env();
        env::set_var("FAKEROLE_STORAGE_BACKEND", "sqlite");
        env::set_var("FAKEROLE_STORAGE_DATABASE_PATH", "/tmp/env-roles.db");
        env::set_var("FAKEROLE_STORAGE_MAX_POOL_SIZE", "8");
        env::set_var("FAKEROLE_LOG_LEVEL", "debug");
        env::set_var("FAKEROLE_LOG_JSON", "true");

        let config = Config::from_env();
        let mut overlaid = Config::default();
        overlaid.storage.max_pool_size = 2;
        let applied = overlaid.apply_env();

        env::set_var("FAKEROLE_STORAGE_MAX_POOL_SIZE", "abc");
        let bad_size = Config::from_env();
        env::set_var("FAKEROLE_STORAGE_MAX_POOL_SIZE", "8");
        env::set_var("FAKEROLE_LOG_JSON", "sometimes");
        let bad_json = Config::default().apply_env();
        env::set_var("FAKEROLE_LOG_JSON", "false");
        env::set_var("FAKEROLE_LOG_LEVEL", "loud");
        let bad_level = Config::from_env();
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.storage.backend, BackendKind::Sqlite);
        assert_eq!(config.storage.database_path, PathBuf::from("/tmp/env-roles.db"));
        assert_eq!(config.storage.max_pool_size, 8);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);

        applied.unwrap();
        assert_eq!(overlaid.storage.max_pool_size, 8);
        assert_eq!(overlaid.storage.connection_timeout, Duration::from_secs(30));

        assert!(matches!(
            bad_size,
            Err(ConfigError::InvalidValue { key: "FAKEROLE_STORAGE_MAX_POOL_SIZE", .. })
        ));
        assert!(matches!(
            bad_json,
            Err(ConfigError::InvalidValue { key: "FAKEROLE_LOG_JSON", .. })
        ));
        assert!(matches!(bad_level, Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("SQLite".parse::<BackendKind>(), Ok(BackendKind::Sqlite));
        assert_eq!("memory".parse::<BackendKind>(), Ok(BackendKind::Memory));
        assert!("redis".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_logging_config_conversion() {
        let logging = LoggingConfig {
            level: "warn".to_string(),
            json_format: true,
            ..LoggingConfig::default()
        };

        let log_config = logging.to_log_config().unwrap();
        assert_eq!(log_config.level, LogLevel::Warn);
        assert!(log_config.json_format);

        let bad = LoggingConfig {
            level: "loud".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            bad.to_log_config(),
            Err(ConfigError::InvalidValue { key: "logging.level", .. })
        ));
    }
}
