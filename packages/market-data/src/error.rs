//! Typed errors for the market-data library.
//!
//! Variants carry owned strings rather than wrapped source errors so the
//! error is `Clone`: a single in-flight fetch hands the same outcome to every
//! caller waiting on it.

use std::time::Duration;

use thiserror::Error;

use mls_client::MlsError;

/// Errors that can occur while querying, enriching or caching market data.
#[derive(Debug, Clone, Error)]
pub enum MarketDataError {
    /// Non-2xx response from the MLS provider, the configuration service or the NLP endpoint
    #[error("{service} returned HTTP {status}: {body}")]
    Upstream {
        service: Service,
        status: u16,
        body: String,
    },

    /// Caller-supplied input was rejected before any I/O
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown community or listing
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// Missing or invalid configuration
    #[error("config error: {0}")]
    Config(String),

    /// Caller-side deadline elapsed
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be decoded
    #[error("parse error: {0}")]
    Parse(String),

    /// Cache backend failure
    #[error("storage error: {0}")]
    Storage(String),

    /// The NLP endpoint classified the prompt as unrelated to real estate
    #[error("query is not a real-estate search")]
    NotRealEstateQuery,
}

/// Which upstream produced an [`MarketDataError::Upstream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Mls,
    CommunityConfig,
    Nlp,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Service::Mls => write!(f, "MLS provider"),
            Service::CommunityConfig => write!(f, "community config service"),
            Service::Nlp => write!(f, "NLP endpoint"),
        }
    }
}

impl MarketDataError {
    pub fn validation(reason: impl Into<String>) -> Self {
        MarketDataError::Validation(reason.into())
    }

    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        MarketDataError::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Lift an MLS transport error, tagging HTTP failures with the service that produced them.
    pub fn from_mls(err: MlsError, service: Service) -> Self {
        match err {
            MlsError::Http { status, body } => MarketDataError::Upstream {
                service,
                status,
                body,
            },
            MlsError::NotRealEstateQuery => MarketDataError::NotRealEstateQuery,
            MlsError::NotFound(key) => MarketDataError::not_found("listing", key),
            MlsError::Network(msg) => MarketDataError::Network(msg),
            MlsError::Parse(msg) => MarketDataError::Parse(msg),
            MlsError::Config(msg) => MarketDataError::Config(msg),
        }
    }

    /// Whether a retry could plausibly succeed: transport failures, timeouts and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            MarketDataError::Network(_) | MarketDataError::Timeout { .. } => true,
            MarketDataError::Upstream { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<MlsError> for MarketDataError {
    fn from(err: MlsError) -> Self {
        MarketDataError::from_mls(err, Service::Mls)
    }
}

impl From<reqwest::Error> for MarketDataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MarketDataError::Parse(err.to_string())
        } else {
            MarketDataError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MarketDataError {
    fn from(err: serde_json::Error) -> Self {
        MarketDataError::Parse(err.to_string())
    }
}

#[cfg(any(feature = "sqlite", feature = "postgres"))]
impl From<sqlx::Error> for MarketDataError {
    fn from(err: sqlx::Error) -> Self {
        MarketDataError::Storage(err.to_string())
    }
}

/// Result type alias for market-data operations.
pub type Result<T> = std::result::Result<T, MarketDataError>;
