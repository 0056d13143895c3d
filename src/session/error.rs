//! Error types for session state and identity exchange.

/// Errors for persisted session state and login.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No suitable directory for persisted state is available.
    #[error("unable to determine state directory (set XDG_CONFIG_HOME or HOME)")]
    StateDirUnavailable,

    /// Filesystem I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Persisted session file could not be (de)serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Login was attempted with a blank access token.
    #[error("access token is empty")]
    EmptyToken,

    /// The identity endpoint could not be reached.
    #[error("identity exchange failed at {endpoint}: {source}")]
    ExchangeUnreachable {
        /// Endpoint that was called.
        endpoint: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The identity endpoint rejected the token.
    #[error("identity exchange rejected with HTTP {status} at {endpoint}")]
    ExchangeRejected {
        /// Endpoint that was called.
        endpoint: String,
        /// Status returned.
        status: u16,
    },

    /// The identity endpoint answered with an unexpected body.
    #[error("invalid identity response from {endpoint}: {source}")]
    ExchangeInvalid {
        /// Endpoint that was called.
        endpoint: String,
        /// The decode error.
        #[source]
        source: serde_json::Error,
    },
}
