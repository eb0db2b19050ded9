//! Core error types for reptimer-core.
//!
//! Validation and not-found conditions are handled inside the store and
//! controller (they surface as no-ops). Persistence errors are the only
//! kind that crosses a component boundary, ending at the controller's
//! caller.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for reptimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence-related errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Failures while mirroring store state to a durable medium.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The record service could not be reached or the body was unreadable.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The record service answered with a non-2xx status.
    #[error("Record service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The configured base URL cannot address the record service.
    #[error("Invalid record service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The category a change refers to is gone from the remote side.
    #[error("Category {0} not found on record service")]
    MissingCategory(String),

    /// Local storage could not be written.
    #[error("Local storage error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Home/config directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Rejected user input. No mutation happens when one of these is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("note must not be empty")]
    EmptyNote,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
