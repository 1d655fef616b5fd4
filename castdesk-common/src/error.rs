//! Common error types for Castdesk

use thiserror::Error;

/// Common result type for Castdesk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Castdesk crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON encoding/decoding of a stored document failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Insert rejected because a row with the same key already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Write payload could not be mapped onto a profile
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl Error {
    /// True for failures of the backing datastore (connectivity, constraint,
    /// encoding). These are never converted into defaults.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Serialization(_) | Error::Io(_) | Error::AlreadyExists(_)
        )
    }
}
