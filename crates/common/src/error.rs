//! Error types shared across CityPulse crates.
//!
//! Stage-level rejects are never errors: a line that fails to parse or
//! fails a range check is counted and dropped. These variants cover the
//! conditions that do stop a command (I/O, unreadable config, bad query).

use std::path::PathBuf;

/// Top-level error type for CityPulse operations.
#[derive(Debug, thiserror::Error)]
pub enum CitypulseError {
    #[error("Query error: {message}")]
    Query { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CitypulseError.
pub type CitypulseResult<T> = Result<T, CitypulseError>;

impl CitypulseError {
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
