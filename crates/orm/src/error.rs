//! Error types for the ORM system
//!
//! Every failure the table gateway, records and relationships can raise is a
//! [`ModelError`]. Driver failures are carried through unchanged as
//! [`ModelError::Database`].

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Error types for ORM operations
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Unknown connection, unregistered entity, invalid settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The table bound to an entity does not exist in the store
    #[error("Table '{table}' does not exist")]
    TableNotFound { table: String },

    /// Attribute is neither a column, a property nor an accessor
    #[error("Unknown attribute '{key}' on {class}")]
    UnknownAttribute { class: String, key: String },

    /// Relation name not declared on the entity
    #[error("Unknown relation '{relation}' on {class}")]
    UnknownRelation { class: String, relation: String },

    /// Call that has no meaning in the current state
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The driver reports the backing store as read-only
    #[error("Table '{table}' is not writable")]
    NotWritable { table: String },

    /// Primary key is missing or has no value
    #[error("Primary key is missing or invalid for table '{table}'")]
    MissingPrimaryKey { table: String },

    /// Row expected to exist was not found
    #[error("Record not found in table '{table}'")]
    NotFound { table: String },

    /// Relationship could not be built
    #[error("Relationship error: {0}")]
    Relationship(String),

    /// Database connection or query error
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ModelError {
    pub(crate) fn unknown_attribute(class: &str, key: &str) -> Self {
        ModelError::UnknownAttribute {
            class: class.to_string(),
            key: key.to_string(),
        }
    }
}

// Convert from sqlx errors
impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        ModelError::Database(err.to_string())
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<ConfigError> for ModelError {
    fn from(err: ConfigError) -> Self {
        ModelError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_attribute_names_class_and_key() {
        let err = ModelError::unknown_attribute("Project", "colour");
        let msg = err.to_string();
        assert!(msg.contains("Project"));
        assert!(msg.contains("colour"));
    }

    #[test]
    fn test_config_error_becomes_configuration() {
        let err: ModelError = ConfigError::Missing {
            field: "default_connection".to_string(),
        }
        .into();
        assert!(matches!(err, ModelError::Configuration(_)));
    }
}
