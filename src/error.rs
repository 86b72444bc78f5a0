//! Custom error types for swiftbackup
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for swiftbackup operations
#[derive(Error, Debug)]
pub enum BackupError {
    /// Configuration-related errors (malformed or incomplete target/backup specs)
    #[error("Configuration error: {0}")]
    Config(String),

    /// An external command exited outside its acceptable exit-code set
    #[error("Command failed with status {status}: {command}")]
    Command { status: i32, command: String },

    /// The per-target lock file is already held by another process
    #[error("Failed to acquire lock on {0}")]
    Lock(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Timestamp could not be mapped to a calendar date
    #[error("Invalid timestamp: {0}")]
    Time(i64),
}

impl BackupError {
    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a failed external command
    pub fn is_command(&self) -> bool {
        matches!(self, Self::Command { .. })
    }

    /// Check if this is a contended lock
    pub fn is_lock(&self) -> bool {
        matches!(self, Self::Lock(_))
    }
}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type alias for swiftbackup operations
pub type BackupResult<T> = Result<T, BackupError>;
