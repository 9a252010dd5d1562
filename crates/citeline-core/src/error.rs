//! Error types for citeline.

use thiserror::Error;

/// Result type alias using citeline's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for citeline operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Evidence store lookup failed
    #[error("Store error: {0}")]
    Store(String),

    /// Embedding service call failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Generation service call failed
    #[error("Generation error: {0}")]
    Generation(String),

    /// Retrieval operation failed
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
