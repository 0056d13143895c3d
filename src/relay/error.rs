//! Error types for single relay attempts.
//!
//! None of these escape the relay pool boundary: the orchestrator absorbs
//! them, logs them, and moves on to the next relay.

use thiserror::Error;

/// Why one relay attempt did not produce a binary.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The relay answered 403: it is blocked upstream for this asset.
    #[error("relay {relay_index} blocked for {source_url} (HTTP 403)")]
    Blocked {
        /// Position of the relay in the pool.
        relay_index: usize,
        /// Upstream source the relay was asked to fetch.
        source_url: String,
    },

    /// Any non-2xx status other than 403.
    #[error("relay {relay_index} returned HTTP {status} for {source_url}")]
    HttpStatus {
        /// Position of the relay in the pool.
        relay_index: usize,
        /// Upstream source the relay was asked to fetch.
        source_url: String,
        /// Status returned by the relay.
        status: u16,
    },

    /// Connection, TLS, or mid-stream body failure.
    #[error("network error from relay {relay_index}: {source}")]
    Network {
        /// Position of the relay in the pool.
        relay_index: usize,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The relay did not answer or stalled between chunks.
    #[error("relay {relay_index} timed out")]
    Timeout {
        /// Position of the relay in the pool.
        relay_index: usize,
    },

    /// The configured relay base URL cannot be parsed.
    #[error("relay {relay_index} has an invalid endpoint URL: {endpoint}")]
    InvalidEndpoint {
        /// Position of the relay in the pool.
        relay_index: usize,
        /// The offending base URL.
        endpoint: String,
    },

    /// The relay answered 2xx but sent no bytes.
    #[error("relay {relay_index} returned an empty body for {source_url}")]
    EmptyBody {
        /// Position of the relay in the pool.
        relay_index: usize,
        /// Upstream source the relay was asked to fetch.
        source_url: String,
    },
}

impl RelayError {
    /// Creates a blocked error.
    pub fn blocked(relay_index: usize, source_url: impl Into<String>) -> Self {
        Self::Blocked {
            relay_index,
            source_url: source_url.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(relay_index: usize, source_url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            relay_index,
            source_url: source_url.into(),
            status,
        }
    }

    /// Creates a network error, promoting reqwest timeouts to [`Self::Timeout`].
    pub fn network(relay_index: usize, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { relay_index }
        } else {
            Self::Network {
                relay_index,
                source,
            }
        }
    }

    /// Creates a timeout error.
    pub fn timeout(relay_index: usize) -> Self {
        Self::Timeout { relay_index }
    }

    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(relay_index: usize, endpoint: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            relay_index,
            endpoint: endpoint.into(),
        }
    }

    /// Creates an empty-body error.
    pub fn empty_body(relay_index: usize, source_url: impl Into<String>) -> Self {
        Self::EmptyBody {
            relay_index,
            source_url: source_url.into(),
        }
    }

    /// Returns true for the expected upstream-blocking case.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}
