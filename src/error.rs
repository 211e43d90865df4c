//! Error types for script discovery and sessions

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or running animation scripts
#[derive(Error, Debug)]
pub enum AnimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The executable could not be launched
    #[error("Failed to launch {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The script did not finish printing its declarations in time
    #[error("{} did not answer --ckb-info within {timeout_ms}ms", .path.display())]
    ProbeTimeout { path: PathBuf, timeout_ms: u64 },

    /// A required declaration was absent or empty
    #[error("Missing required declaration: {0}")]
    MissingField(&'static str),

    /// No script with this id or name is registered
    #[error("Animation not found: {0}")]
    NotFound(String),

    /// A parameter value did not fit the declared type
    #[error("Invalid value {value:?} for parameter {name}")]
    InvalidParam { name: String, value: String },

    /// The script has no parameter with this name
    #[error("Unknown parameter: {0}")]
    UnknownParam(String),

    #[error("Config error: {0}")]
    Config(String),
}
