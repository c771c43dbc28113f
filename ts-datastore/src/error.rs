//! Datastore error types

use thiserror::Error;
use ts_sql::ValidationError;

use crate::config::ConfigError;

/// Error returned by every datastore action.
#[derive(Error, Debug)]
pub enum DatastoreError {
    /// Filter, field or record failed validation; nothing was executed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No resource with this id exists.
    #[error("Resource '{0}' not found")]
    ResourceNotFound(String),

    /// Resource is read-only and `force` was not set.
    #[error("Resource '{0}' is read-only, use force to modify it")]
    ReadOnly(String),

    /// Action name is not registered.
    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    /// Action parameter is missing or has the wrong type.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// SQLite failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DatastoreError {
    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the caller is at fault (bad filters, fields or parameters).
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidParameter { .. })
    }
}

/// Result alias for datastore operations.
pub type Result<T> = std::result::Result<T, DatastoreError>;
