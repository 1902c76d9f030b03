//! Error types for the MLS client.

use thiserror::Error;

/// Result type for MLS client operations.
pub type Result<T> = std::result::Result<T, MlsError>;

/// MLS client errors.
#[derive(Debug, Error)]
pub enum MlsError {
    /// Non-2xx response from the provider
    #[error("MLS API error {status}: {body}")]
    Http { status: u16, body: String },

    /// The NLP endpoint rejected the prompt as not being a real-estate query (HTTP 406)
    #[error("prompt is not a real-estate query")]
    NotRealEstateQuery,

    /// Single-resource lookup returned 404
    #[error("not found: {0}")]
    NotFound(String),

    /// Network error (connection failed, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// Parse error (invalid JSON, unexpected response format)
    #[error("parse error: {0}")]
    Parse(String),

    /// Configuration error (missing API key, invalid base URL)
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for MlsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MlsError::Parse(err.to_string())
        } else {
            MlsError::Network(err.to_string())
        }
    }
}
