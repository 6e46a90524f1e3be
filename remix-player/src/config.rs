//! Configuration management for remix-player
//!
//! Two-tier configuration: a minimal TOML bootstrap file (database path,
//! port, analysis backend URL, logging) plus command-line/environment
//! overrides applied in main. TOML settings cannot change while running.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Bootstrap configuration loaded from a TOML file
///
/// Minimal by design: only settings the process needs before it can
/// reach its database or serve requests.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the analysis backend
    #[serde(default = "default_analysis_url")]
    pub analysis_url: String,

    /// Logging configuration (optional)
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

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            port: default_port(),
            analysis_url: default_analysis_url(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("remix.db")
}

fn default_port() -> u16 {
    5750
}

fn default_analysis_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults
    /// when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/remix.toml")).unwrap();
        assert_eq!(config.port, 5750);
        assert_eq!(config.analysis_url, "http://localhost:3001");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remix.toml");
        std::fs::write(&path, "port = 8080\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path, PathBuf::from("remix.db"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remix.toml");
        std::fs::write(&path, "port = \"not a number").unwrap();

        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }
}
