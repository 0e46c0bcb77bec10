use std::path::PathBuf;

use thiserror::Error;

/// Operational failures of the validator itself.
///
/// Problems found *in* a clock tree document are never reported through this
/// type; they are collected as strings in a [`crate::validator::ValidationOutcome`].
#[derive(Error, Debug)]
pub enum ClockTreeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema file could not be read: {path} - {details}")]
    SchemaRead { path: PathBuf, details: String },

    #[error("Schema compilation failed: {details}")]
    SchemaCompile { details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system traversal error: {path} - {reason}")]
    FileSystemTraversal { path: PathBuf, reason: String },

    #[error("Concurrent operation error: {details}")]
    Concurrency { details: String },
}

impl From<crate::config::ConfigError> for ClockTreeError {
    fn from(err: crate::config::ConfigError) -> Self {
        ClockTreeError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ClockTreeError>;
