//! Core error types for focusbell-core.
//!
//! Every fallible operation in the library returns one of the enums below.
//! The engine itself never propagates these to the caller across the
//! command channel; it turns them into `LOG` events instead.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusbell-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Settings persistence errors
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Scheduling primitive errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Wire protocol errors
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The engine task is gone and no longer accepts commands
    #[error("Engine channel closed")]
    ChannelClosed,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a [`SettingsStore`](crate::storage::SettingsStore).
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read the persisted record
    #[error("Failed to load settings from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to write the persisted record
    #[error("Failed to save settings to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// The record exists but does not describe valid settings
    #[error("Stored settings are corrupt: {0}")]
    Corrupt(String),

    /// SQLite backend failure
    #[error("Settings database error: {0}")]
    Database(String),

    /// Backend refused the operation (used by in-memory stores)
    #[error("Settings store unavailable: {0}")]
    Unavailable(String),

    /// IO errors while locating the store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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

    /// Unknown dotted key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors for timer settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A duration was zero or negative
    #[error("Invalid value for '{field}': must be greater than zero (got {value})")]
    NonPositive { field: &'static str, value: i64 },

    /// A duration does not fit in 32 bits of seconds
    #[error("Invalid value for '{field}': {value} exceeds the maximum of {max}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        max: u32,
    },

    /// The interval would never complete inside the session
    #[error("Interval duration ({interval}s) must not exceed session duration ({session}s)")]
    IntervalExceedsSession { interval: u32, session: u32 },
}

/// Errors from the scheduling primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// No runtime or timer facility is available to deliver wake-ups
    #[error("Scheduler unavailable: {0}")]
    Unavailable(String),
}

/// Errors decoding or encoding wire messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Message is not valid JSON or does not match any known message shape
    #[error("Malformed message: {0}")]
    Malformed(String),
}

impl From<rusqlite::Error> for SettingsError {
    fn from(err: rusqlite::Error) -> Self {
        SettingsError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Malformed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
