//! Core error types for quarterlog-core.
//!
//! The timer engine itself never fails; everything here belongs to the
//! collaborators around it (session storage, publishing, configuration,
//! best-effort alert channels) and to input validation at session end.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for quarterlog-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Publish workflow errors
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Alert channel errors
    #[error("Alert error: {0}")]
    Alert(#[from] AlertError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether retrying the save-then-publish sequence could succeed.
    ///
    /// Validation failures need different input; collaborator I/O may be
    /// transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CoreError::Validation(_))
    }
}

/// Session storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to list the sessions root
    #[error("Failed to list folders in {path}: {source}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a folder
    #[error("Failed to create folder {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a session file
    #[error("Failed to write session file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a folder's contents
    #[error("Failed to read folder {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Publish workflow errors, one per git step.
#[derive(Error, Debug)]
pub enum PublishError {
    /// git could not be launched at all
    #[error("Failed to run git: {0}")]
    GitUnavailable(#[source] std::io::Error),

    /// `git add` failed
    #[error("Failed to stage files: {0}")]
    StageFailed(String),

    /// `git commit` failed for a reason other than "nothing to commit"
    #[error("Failed to commit changes: {0}")]
    CommitFailed(String),

    /// `git push` failed
    #[error("Failed to push: {0}")]
    PushFailed(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to locate or create the config directory
    #[error("Failed to prepare config directory {path}: {source}")]
    DirUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Failures of a single best-effort alert channel.
#[derive(Error, Debug)]
pub enum AlertError {
    /// The sound could not be played
    #[error("Sound playback failed: {0}")]
    Sound(String),

    /// The system notification could not be raised
    #[error("System notification failed: {0}")]
    Notification(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
