//! Error types for clawboard-core

use thiserror::Error;

/// Main error type for the clawboard-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid discovery pattern
    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// A step depends on an artifact an earlier step has not produced yet
    #[error("{artifact} not found, {hint}")]
    MissingArtifact { artifact: String, hint: String },

    /// System probe (uptime, df, free) failed
    #[error("probe `{command}` failed: {message}")]
    Probe { command: String, message: String },
}

/// Result type alias for clawboard-core
pub type Result<T> = std::result::Result<T, Error>;
