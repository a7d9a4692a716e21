//! Error types for beacon.

use thiserror::Error;

/// Result type alias using beacon's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for beacon operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Broker (pub/sub) operation failed
    #[error("Broker error: {0}")]
    Broker(#[from] redis::RedisError),

    /// Durable keyed-store write failed
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Queue backend returned unusable data
    #[error("Queue error: {0}")]
    Queue(String),

    /// Authenticated but not authorized
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Session could not be resumed
    #[error("Session error: {0}")]
    Session(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
