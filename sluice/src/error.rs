//! Error types for the sluice write path.
//!
//! End-of-stream is not an error: [`StreamEncoder::pull`](crate::encoder::StreamEncoder::pull)
//! reports it through its return value. Everything in here is a real failure
//! that the caller owns (retry policy included).

use thiserror::Error;

/// The main error type for all sluice operations.
#[derive(Error, Debug)]
pub enum SluiceError {
    /// The request never produced a response: connection refused, DNS
    /// failure, timeout, or a base URL that could not be parsed.
    #[error("transport error: {source}")]
    Transport {
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// A write was answered with something other than `204 No Content`.
    #[error("received bad status code [{status}], expected [{expected}]")]
    BadStatus {
        /// The HTTP status code returned by the server.
        status: u16,
        /// The status code that signals success.
        expected: u16,
    },

    /// An administrative query was answered with something other than `200 OK`.
    #[error("bad status code during query ({command}): {status}, body: {body}")]
    QueryFailed {
        /// The query command that was sent.
        command: String,
        /// The HTTP status code returned by the server.
        status: u16,
        /// The response body text, kept for diagnostics.
        body: String,
    },

    /// Failed to build the HTTP transport.
    #[error("failed to create HTTP client: {source}")]
    ClientCreate {
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// A line-protocol metric must carry at least one field.
    #[error("metric '{measurement}' has no fields")]
    NoFields {
        /// The measurement name of the rejected metric.
        measurement: String,
    },
}

impl SluiceError {
    /// Returns the HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadStatus { status, .. } | Self::QueryFailed { status, .. } => Some(*status),
            Self::Transport { source } | Self::ClientCreate { source } => {
                source.status().map(|s| s.as_u16())
            }
            Self::NoFields { .. } => None,
        }
    }

    /// Returns `true` if the request failed because the deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source } if source.is_timeout())
    }
}

/// Type alias for `Result<T, SluiceError>`.
pub type Result<T> = std::result::Result<T, SluiceError>;
