//! Error type for fetching and decoding.

use thiserror::Error;

/// Errors returned by [`Client`](crate::Client) and [`DataSource`](crate::DataSource)
/// implementations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} not found")]
    NotFound { url: String },

    #[error("invalid protobuf payload: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error("invalid packed data: {0}")]
    Decode(#[from] rocktree_decode::DecodeError),

    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("gave up on {url} after {attempts} attempts: {source}")]
    RetryExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Transport failures and unexpected statuses are worth retrying;
    /// missing resources and malformed payloads are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Status { .. })
    }
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
