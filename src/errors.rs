use thiserror::Error;

use crate::reference::InvalidReference;

/// Errors that can occur while parsing, validating, or resolving references.
#[derive(Error, Debug)]
pub enum ScripRefError {
    #[error("invalid reference '{reference}': {reason}")]
    Validation { reference: String, reason: String },

    #[error("no verse text found for '{reference}'")]
    NotFound { reference: String },

    #[error("database error: {message} (operation: {operation})")]
    Database { message: String, operation: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("import error: {message}")]
    Import { message: String },

    #[error("plan content error: {message}")]
    Plan { message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<InvalidReference> for ScripRefError {
    fn from(invalid: InvalidReference) -> Self {
        ScripRefError::Validation {
            reference: invalid.segment().to_string(),
            reason: invalid.to_string(),
        }
    }
}

/// Convenience alias for results using `ScripRefError`.
pub type Result<T> = std::result::Result<T, ScripRefError>;
