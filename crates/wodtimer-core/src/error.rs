//! Core error types for wodtimer-core.
//!
//! Timer transitions never fail: an operation that does not apply to the
//! current state is a no-op. Errors are reserved for the edges of the
//! library (storage, configuration, device capabilities, validation of
//! user-entered timer configs).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for wodtimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Device capability errors (orientation, wake lock)
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
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

    /// Stored row could not be decoded
    #[error("Corrupt record '{id}': {message}")]
    CorruptRecord { id: String, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
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

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Home/data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A duration that must be positive was zero
    #[error("'{field}' must be at least 1 second")]
    ZeroDuration { field: &'static str },

    /// A round count that must be positive was zero
    #[error("'{field}' must be at least 1")]
    ZeroCount { field: &'static str },

    /// Seconds component of a minutes/seconds pair out of range
    #[error("seconds must be below 60, got {0}")]
    SecondsOutOfRange(u32),

    /// Referenced item does not exist
    #[error("{collection} has no item '{id}'")]
    NotFound { collection: String, id: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Device capability errors.
///
/// These are never fatal: callers log them and keep the timer usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The platform does not offer the capability at all
    #[error("{0} is not supported on this device")]
    Unsupported(&'static str),

    /// The capability exists but the call failed
    #[error("{capability} failed: {message}")]
    Failed {
        capability: &'static str,
        message: String,
    },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_name_the_field() {
        let err = ValidationError::ZeroDuration { field: "work_secs" };
        assert_eq!(err.to_string(), "'work_secs' must be at least 1 second");
    }

    #[test]
    fn core_error_wraps_device_error() {
        let err: CoreError = DeviceError::Unsupported("orientation lock").into();
        assert!(err.to_string().contains("orientation lock is not supported"));
    }

    #[test]
    fn json_errors_convert_into_core_error() {
        let err: CoreError = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert!(matches!(err, CoreError::Json(_)));
    }

    #[test]
    fn rusqlite_errors_map_to_query_failed() {
        let err: DatabaseError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, DatabaseError::QueryFailed(_)));
    }
}
