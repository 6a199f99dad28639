//! ORM configuration
//!
//! Settings are read from `ORM_*` environment variables with defaults for
//! anything not set.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use thiserror::Error;

/// Default nesting budget for eager loading
pub const DEFAULT_MAX_EAGER_DEPTH: usize = 4;

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("Invalid value '{value}' for {field}, expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    EnvVar(String),
    Default,
}

/// ORM-wide settings
#[derive(Debug, Clone)]
pub struct OrmConfig {
    /// Connection used by entities that do not name one
    pub default_connection: String,
    /// Levels of nested eager loading allowed below a top-level query
    pub max_eager_depth: usize,
    /// Column stamped on insert when the table has it
    pub created_column: String,
    /// Column stamped on update when the table has it
    pub updated_column: String,
    /// chrono format string for stamped values
    pub timestamp_format: String,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            default_connection: "default".to_string(),
            max_eager_depth: DEFAULT_MAX_EAGER_DEPTH,
            created_column: "created_at".to_string(),
            updated_column: "updated_at".to_string(),
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

impl OrmConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            default_connection: env_or("ORM_DEFAULT_CONNECTION", defaults.default_connection),
            max_eager_depth: env_parse("ORM_MAX_EAGER_DEPTH", defaults.max_eager_depth)?,
            created_column: env_or("ORM_CREATED_COLUMN", defaults.created_column),
            updated_column: env_or("ORM_UPDATED_COLUMN", defaults.updated_column),
            timestamp_format: env_or("ORM_TIMESTAMP_FORMAT", defaults.timestamp_format),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_connection.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "default_connection".to_string(),
            });
        }
        if self.created_column.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "created_column".to_string(),
            });
        }
        if self.updated_column.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "updated_column".to_string(),
            });
        }
        if StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::InvalidValue {
                field: "timestamp_format".to_string(),
                value: self.timestamp_format.clone(),
                expected: "a chrono strftime format".to_string(),
            });
        }
        Ok(())
    }

    /// Source of each setting, for debugging
    pub fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();
        for (field, var) in [
            ("default_connection", "ORM_DEFAULT_CONNECTION"),
            ("max_eager_depth", "ORM_MAX_EAGER_DEPTH"),
            ("created_column", "ORM_CREATED_COLUMN"),
            ("updated_column", "ORM_UPDATED_COLUMN"),
            ("timestamp_format", "ORM_TIMESTAMP_FORMAT"),
        ] {
            let source = if env::var(var).is_ok() {
                ConfigSource::EnvVar(var.to_string())
            } else {
                ConfigSource::Default
            };
            sources.insert(field.to_string(), source);
        }
        sources
    }

    pub fn with_default_connection(mut self, name: &str) -> Self {
        self.default_connection = name.to_string();
        self
    }

    pub fn with_max_eager_depth(mut self, depth: usize) -> Self {
        self.max_eager_depth = depth;
        self
    }

    pub fn with_timestamp_format(mut self, format: &str) -> Self {
        self.timestamp_format = format.to_string();
        self
    }

    pub fn with_timestamp_columns(mut self, created: &str, updated: &str) -> Self {
        self.created_column = created.to_string();
        self.updated_column = updated.to_string();
        self
    }
}

fn env_or(var: &str, default: String) -> String {
    env::var(var).unwrap_or(default)
}

fn env_parse<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: var.to_string(),
            value: raw.clone(),
            expected: std::any::type_name::<T>().to_string(),
        }),
        Err(_) => Ok(default),
    }
}
