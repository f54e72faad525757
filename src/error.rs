//! Error types for pocketconf

use crate::config::DataType;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pocketconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pocketconf
#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file could not be written back. The in-memory values stay
    /// authoritative and the store stays dirty.
    #[error("Failed to save changes to '{path}': {source}. Make sure you have permission to write to this file.")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Failed to serialize data: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to parse '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    // -------------------------------------------------------------------------
    // Key Errors
    // -------------------------------------------------------------------------
    #[error("Key '{key}' is not declared in the schema of {file}")]
    UnknownKey { file: String, key: String },

    #[error("Type mismatch for {key}: declared {expected}, requested {actual}")]
    TypeMismatch {
        key: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("Schema error for {key}: {reason}")]
    Schema { key: String, reason: String },

    #[error("Key '{key}' is declared more than once in {file}")]
    DuplicateKey { file: String, key: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Config file '{0}' is not registered")]
    UnknownFile(String),

    #[error("Config file '{0}' is registered more than once")]
    DuplicateFile(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this error means a change could not be persisted
    #[must_use]
    pub fn is_write_error(&self) -> bool {
        matches!(self, Error::FileWrite { .. } | Error::DirectoryCreate { .. })
    }

    /// Check if this error comes from code asking for keys or types the schema
    /// never declared
    #[must_use]
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownKey { .. } | Error::TypeMismatch { .. } | Error::UnknownFile(_)
        )
    }
}
