//! Core error types for repkeeper-core.
//!
//! This module defines the error hierarchy using thiserror. Most user-facing
//! rejections (deleting the last set, moving past a list boundary, non-numeric
//! weights) are silent no-ops and never surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for repkeeper-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Rest timer state machine rejections
    #[error("Rest timer error: {0}")]
    RestTimer(#[from] RestTimerError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Notification scheduling failed (permission denied, scheduler gone)
    #[error("Notification error: {0}")]
    Notification(String),

    /// The session was ended; the runtime accepts no further commands
    #[error("Session {session_id} has already ended")]
    SessionEnded { session_id: String },

    /// The async runtime driver stopped before replying
    #[error("Session runtime is no longer running")]
    RuntimeStopped,

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Backing store refused the write (used by in-memory stores)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
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

    /// Unknown dotted configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Rest timer state machine errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RestTimerError {
    /// `start` was called while a countdown is in progress
    #[error("Rest timer is already running ({remaining_secs}s remaining)")]
    AlreadyRunning { remaining_secs: u64 },

    /// `start` was called with (or fell back to) a zero duration
    #[error("Rest timer duration must be greater than zero")]
    ZeroDuration,
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Out of bounds
    #[error("Index {index} out of bounds for {collection} (length: {len})")]
    OutOfBounds {
        collection: String,
        index: usize,
        len: usize,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
