//! Common error types for speedtest exporter components.

use std::fmt;

/// A specialized Result type for measurement operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for measurement operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new HTTP transport error.
    pub fn http(msg: impl fmt::Display) -> Self {
        Error::Http(msg.to_string())
    }

    /// Create a new parse error.
    pub fn parse(msg: impl fmt::Display) -> Self {
        Error::Parse(msg.to_string())
    }

    /// Create a new invalid response error.
    pub fn invalid_response(msg: impl fmt::Display) -> Self {
        Error::InvalidResponse(msg.to_string())
    }
}
