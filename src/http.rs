//! Shared HTTP client construction policy.
//!
//! Relay, quota, parse and identity clients all go through
//! [`build_http_client`] so they agree on timeouts and User-Agent.

use std::time::Duration;

use reqwest::Client;

use crate::relay::constants::{
    RELAY_CONNECT_TIMEOUT_SECS, RELAY_READ_TIMEOUT_SECS, RELAY_RESPONSE_TIMEOUT_SECS,
};
use crate::user_agent;

/// Timeout settings for one HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// TCP/TLS connect timeout.
    pub connect: Duration,
    /// Time allowed until response headers arrive.
    pub response: Duration,
    /// Idle time allowed between body reads.
    pub read: Duration,
}

impl HttpTimeouts {
    /// Builds timeouts from whole seconds.
    #[must_use]
    pub fn from_secs(connect_secs: u64, response_secs: u64, read_secs: u64) -> Self {
        Self {
            connect: Duration::from_secs(connect_secs),
            response: Duration::from_secs(response_secs),
            read: Duration::from_secs(read_secs),
        }
    }
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self::from_secs(
            RELAY_CONNECT_TIMEOUT_SECS,
            RELAY_RESPONSE_TIMEOUT_SECS,
            RELAY_READ_TIMEOUT_SECS,
        )
    }
}

/// Builds a reqwest client using the shared policy.
///
/// `decompress` should be false for media streams so `content-length`
/// matches the bytes actually counted for progress.
///
/// # Errors
///
/// Returns the reqwest builder error when TLS or proxy setup fails.
pub fn build_http_client(timeouts: HttpTimeouts, decompress: bool) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(timeouts.connect)
        .read_timeout(timeouts.read)
        .gzip(decompress)
        .user_agent(user_agent::default_user_agent())
        .build()
}
