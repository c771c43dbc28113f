//! Datastore configuration, loaded from TOML.
//!
//! ```toml
//! database = "/var/lib/ts-datastore/data.db"
//! default_limit = 100
//! max_limit = 32000
//! max_filter_values = 1000
//! ```
//!
//! Every key is optional; missing keys take the defaults above
//! (`database` defaults to an in-memory database).

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::constants::{DEFAULT_LIMIT, IN_MEMORY_DATABASE, MAX_LIMIT};

/// Errors raised while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Runtime settings of a [`Datastore`](crate::Datastore).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatastoreConfig {
    /// SQLite database path, or `:memory:`.
    pub database: String,
    /// Rows returned by a search without an explicit limit.
    pub default_limit: u32,
    /// Cap applied to any requested limit.
    pub max_limit: u32,
    /// Maximum number of values in a list-valued filter.
    pub max_filter_values: usize,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            database: IN_MEMORY_DATABASE.to_string(),
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            max_filter_values: ts_sql::DEFAULT_MAX_FILTER_VALUES,
        }
    }
}

impl DatastoreConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Use a different database path.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Check the limits are consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_limit == 0 {
            return Err(ConfigError::Invalid("max_limit must be positive".into()));
        }
        if self.default_limit > self.max_limit {
            return Err(ConfigError::Invalid(format!(
                "default_limit ({}) exceeds max_limit ({})",
                self.default_limit, self.max_limit
            )));
        }
        if self.max_filter_values == 0 {
            return Err(ConfigError::Invalid(
                "max_filter_values must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Whether the database lives only in memory.
    pub fn is_in_memory(&self) -> bool {
        self.database == IN_MEMORY_DATABASE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = DatastoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, DatastoreConfig::default());
        assert!(config.is_in_memory());
        assert_eq!(config.default_limit, 100);
    }

    #[test]
    fn test_partial_config() {
        let config = DatastoreConfig::from_toml_str(
            r#"
            database = "/tmp/ts.db"
            max_limit = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.database, "/tmp/ts.db");
        assert_eq!(config.max_limit, 500);
        assert_eq!(config.default_limit, DEFAULT_LIMIT);
        assert!(!config.is_in_memory());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = DatastoreConfig::from_toml_str("databse = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_inconsistent_limits() {
        let err = DatastoreConfig::from_toml_str("default_limit = 10\nmax_limit = 5").unwrap_err();
        assert!(err.to_string().contains("exceeds max_limit"), "{err}");
    }

    #[test]
    fn test_missing_file() {
        let err = DatastoreConfig::from_file(Path::new("/nonexistent/ts-datastore.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
