//! Mnemograph error types

use thiserror::Error;

/// Mnemograph error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Memory store unavailable or rejected the request
    #[error("Memory store error: {0}")]
    Store(String),

    /// Graph store unavailable or rejected the query
    #[error("Graph store error: {0}")]
    GraphStore(String),

    /// Completion endpoint failed or returned no answer
    #[error("Completion error: {0}")]
    Completion(String),

    /// Graph rendering error
    #[error("Render error: {0}")]
    Render(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Mnemograph operations
pub type Result<T> = std::result::Result<T, Error>;
