//! Error types for context broker client operations

use thiserror::Error;

/// Result type alias for context broker client operations
pub type Result<T> = std::result::Result<T, NgsiClientError>;

/// Errors that can occur while talking to a context broker
///
/// HTTP responses are never turned into errors here, whatever their status.
/// Only failures to complete the exchange end up in this type.
#[derive(Error, Debug)]
pub enum NgsiClientError {
    /// HTTP request failed (connection refused, timeout, bad header value)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid broker URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Payload could not be serialized, or a response body could not be parsed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unknown NGSI dialect name
    #[error("Unknown NGSI version: {0}")]
    UnknownDialect(String),

    /// Malformed percent-encoding
    #[error("Invalid URI encoding: {0}")]
    InvalidEncoding(String),
}
