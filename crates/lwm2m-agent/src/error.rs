//! Agent startup errors

use ngsi_client::NgsiClientError;
use thiserror::Error;

/// Result type for agent startup
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that stop the agent from starting
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// An environment override held a value that could not be used
    #[error("Invalid value for {key}: '{value}'")]
    InvalidOverride { key: String, value: String },

    #[error("Context broker client error: {0}")]
    Client(#[from] NgsiClientError),

    #[error("Failed to bind northbound server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
