//! Configuration module for mapping TOML files onto connection settings.
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::core::driver::{Attr, AttrValue, ConnectOptions};
use crate::core::{Error, Result};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub sqlite: Option<SqliteConfig>,
}

/// Connection target configuration.
#[derive(Debug, Deserialize)]
pub struct ConnectionConfig {
    /// DSN of the form `scheme:target`, e.g. `"sqlite:app.db"`
    pub dsn: String,
}

/// SQLite attribute defaults applied when the connection opens.
#[derive(Debug, Deserialize)]
pub struct SqliteConfig {
    pub foreign_keys: Option<bool>,
    pub busy_timeout_ms: Option<i64>,
    pub journal_mode: Option<String>,
}

impl Config {
    /// Translates the configured defaults into the attribute assignments
    /// handed to `Driver::connect`.
    pub fn connect_options(&self) -> ConnectOptions {
        let mut options = ConnectOptions::default();
        if let Some(sqlite) = &self.sqlite {
            if let Some(foreign_keys) = sqlite.foreign_keys {
                options = options.attribute(Attr::ForeignKeys, AttrValue::Bool(foreign_keys));
            }
            if let Some(busy_timeout_ms) = sqlite.busy_timeout_ms {
                options = options.attribute(Attr::BusyTimeoutMs, AttrValue::Int(busy_timeout_ms));
            }
            if let Some(journal_mode) = &sqlite.journal_mode {
                options =
                    options.attribute(Attr::JournalMode, AttrValue::Str(journal_mode.clone()));
            }
        }
        options
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = r#"
[connection]
dsn = "sqlite:app.db"

[sqlite]
foreign_keys = true
busy_timeout_ms = 5000
journal_mode = "wal"
"#;

    #[test]
    fn test_load_config_from_str() {
        let config: Config = toml::from_str(SAMPLE_CONFIG).expect("Failed to parse sample config");
        assert_eq!(config.connection.dsn, "sqlite:app.db");
        let sqlite = config.sqlite.expect("SQLite configuration not found");
        assert_eq!(sqlite.foreign_keys, Some(true));
        assert_eq!(sqlite.busy_timeout_ms, Some(5000));
        assert_eq!(sqlite.journal_mode.as_deref(), Some("wal"));
    }

    #[test]
    fn test_connect_options_cover_configured_defaults() {
        let config: Config = toml::from_str(SAMPLE_CONFIG).unwrap();
        let options = config.connect_options();

        assert_eq!(options.attributes.len(), 3);
        assert!(options
            .attributes
            .contains(&(Attr::ForeignKeys, AttrValue::Bool(true))));
        assert!(options
            .attributes
            .contains(&(Attr::BusyTimeoutMs, AttrValue::Int(5000))));
        assert!(options
            .attributes
            .contains(&(Attr::JournalMode, AttrValue::Str("wal".to_string()))));
    }

    #[test]
    fn test_missing_sections_mean_no_defaults() {
        let config: Config = toml::from_str("[connection]\ndsn = \"sqlite::memory:\"\n").unwrap();
        assert!(config.sqlite.is_none());
        assert!(config.connect_options().attributes.is_empty());
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let result: Result<Config> =
            toml::from_str("{ not toml }").map_err(|e| Error::Config(e.to_string()));
        match result.unwrap_err() {
            Error::Config(_) => {}
            other => panic!("Expected Config error, got {other:?}"),
        }
    }
}
