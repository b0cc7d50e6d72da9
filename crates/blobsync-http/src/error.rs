//! Error types for the HTTP channel.
//!
//! Request failures never leave the channel as errors (they collapse into
//! `None`); these types cover construction and single-attempt transport
//! failures.

use thiserror::Error;

/// Errors raised while building a channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The configured base URL does not parse.
    #[error("Invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        /// The rejected URL
        url: String,
        /// Parser error
        source: url::ParseError,
    },

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Transport-level failure of one attempt. Always retryable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, DNS failure and the like.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The attempt ran out of time.
    #[error("Request timed out")]
    Timeout,

    /// Any other transport error (reset, truncated body, ...).
    #[error("Transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}
