//! Error types for gridscout-core

use thiserror::Error;

/// Result type alias using gridscout-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gridscout-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport error (connectivity absent, or the request failed before a
    /// response arrived)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote system rejected the request with a non-2xx response
    #[error("Remote API error (HTTP {status}): {body}")]
    Remote { status: u16, body: String },

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

impl Error {
    /// Whether this error is a transport-level failure (no response received).
    ///
    /// Transport failures are always recoverable: the unit of work is skipped
    /// and retried on the next sync cycle.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
