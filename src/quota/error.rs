//! Error types for quota service calls.

use thiserror::Error;

/// Errors talking to the quota service.
///
/// [`crate::quota::QuotaGate::check`] folds every one of these into "not
/// allowed"; only `consume` surfaces them.
#[derive(Debug, Error)]
pub enum QuotaError {
    /// The quota service could not be reached.
    #[error("quota service unreachable at {endpoint}: {source}")]
    Unreachable {
        /// Endpoint that was called.
        endpoint: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The quota service did not answer in time.
    #[error("quota service timed out at {endpoint}")]
    Timeout {
        /// Endpoint that was called.
        endpoint: String,
    },

    /// Unexpected HTTP status from the quota service.
    #[error("quota service returned HTTP {status} at {endpoint}")]
    HttpStatus {
        /// Endpoint that was called.
        endpoint: String,
        /// Status returned.
        status: u16,
    },

    /// The response body did not have the expected shape.
    #[error("invalid quota service response from {endpoint}: {source}")]
    InvalidResponse {
        /// Endpoint that was called.
        endpoint: String,
        /// The decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The response decoded but carried no usage snapshot.
    #[error("quota service response from {endpoint} carried no usage snapshot")]
    MissingUsage {
        /// Endpoint that was called.
        endpoint: String,
    },

    /// Consume was asked for zero units.
    #[error("refusing to consume {units} units; at least one is required")]
    InvalidUnitCount {
        /// The rejected unit count.
        units: u32,
    },
}

impl QuotaError {
    /// Creates a transport error, promoting reqwest timeouts to [`Self::Timeout`].
    pub fn unreachable(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                endpoint: endpoint.into(),
            }
        } else {
            Self::Unreachable {
                endpoint: endpoint.into(),
                source,
            }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(endpoint: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Creates a decode error.
    pub fn invalid_response(endpoint: impl Into<String>, source: serde_json::Error) -> Self {
        Self::InvalidResponse {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Creates a missing-usage error.
    pub fn missing_usage(endpoint: impl Into<String>) -> Self {
        Self::MissingUsage {
            endpoint: endpoint.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_error_http_status_display() {
        let error = QuotaError::http_status("https://quota.example/api", 503);
        let msg = error.to_string();
        assert!(msg.contains("503"), "Expected status in: {msg}");
        assert!(msg.contains("https://quota.example/api"), "Expected endpoint in: {msg}");
    }

    #[test]
    fn test_quota_error_invalid_unit_count_display() {
        let msg = QuotaError::InvalidUnitCount { units: 0 }.to_string();
        assert!(msg.contains("0 units"), "got: {msg}");
    }

    #[test]
    fn test_quota_error_invalid_response_display() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let msg = QuotaError::invalid_response("https://q", source).to_string();
        assert!(msg.contains("invalid quota service response"), "got: {msg}");
    }
}
