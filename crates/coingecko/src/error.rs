//! Error types for the CoinGecko client.
//!
//! Transience classification here drives the retry policy in
//! [`crate::retry`].

use thiserror::Error;

/// Errors that can occur when talking to CoinGecko.
#[derive(Debug, Error)]
pub enum CoinGeckoError {
    /// API request failed.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error message from the API body.
        message: String,
    },

    /// Rate limit exceeded (HTTP 429).
    #[error("rate limit exceeded")]
    RateLimit {
        /// Server-supplied Retry-After hint, in seconds.
        retry_after_secs: Option<u64>,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error (bad proxy URL, client build failure).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CoinGeckoError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a rate limit error with an optional Retry-After hint.
    #[must_use]
    pub fn rate_limit(retry_after_secs: Option<u64>) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Returns true if retrying the request later could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for CoinGeckoError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Result type alias for CoinGecko operations.
pub type Result<T> = std::result::Result<T, CoinGeckoError>;
