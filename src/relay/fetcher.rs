//! One streamed GET against one relay.

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;
use tracing::{debug, instrument};

use crate::asset::{Asset, MediaBinary};
use crate::http::{HttpTimeouts, build_http_client};
use crate::progress::{PercentTracker, ProgressEvent, ProgressReporter};

use super::{RelayEndpoint, RelayError};

/// Upper bound on the buffer pre-allocated from a declared content length.
const MAX_PREALLOCATED_BYTES: u64 = 64 * 1024 * 1024;

/// Transient record of one relay attempt, kept for logging only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquisitionAttempt {
    /// Position of the relay in the pool.
    pub relay_index: usize,
    /// Status the relay answered with, once headers arrived.
    pub http_status: Option<u16>,
    /// Bytes received so far.
    pub bytes_loaded: u64,
    /// Declared content length, when the relay sent one.
    pub total_bytes: Option<u64>,
}

impl AcquisitionAttempt {
    /// Starts a record for the relay at `relay_index`.
    #[must_use]
    pub fn new(relay_index: usize) -> Self {
        Self {
            relay_index,
            ..Self::default()
        }
    }
}

/// Streams media bytes from a relay into memory.
///
/// Designed to be created once and shared; the inner client pools
/// connections across relays and acquisitions.
#[derive(Debug, Clone)]
pub struct StreamingFetcher {
    client: Client,
    response_timeout: Duration,
}

impl StreamingFetcher {
    /// Creates a fetcher with its own client.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error when the client cannot be built.
    pub fn new(timeouts: HttpTimeouts) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(timeouts, false)?,
            response_timeout: timeouts.response,
        })
    }

    /// Creates a fetcher around an existing client.
    #[must_use]
    pub fn with_client(client: Client, response_timeout: Duration) -> Self {
        Self {
            client,
            response_timeout,
        }
    }

    /// Fetches `asset` through `endpoint`, reporting percentages as chunks arrive.
    ///
    /// `attempt` is updated in place so the caller can log how far the
    /// attempt got even when it fails.
    ///
    /// # Errors
    ///
    /// - [`RelayError::Blocked`] on HTTP 403
    /// - [`RelayError::HttpStatus`] on any other non-2xx
    /// - [`RelayError::Network`] / [`RelayError::Timeout`] on transport failure
    /// - [`RelayError::EmptyBody`] when a 2xx carried no bytes
    #[instrument(
        skip(self, asset, attempt, reporter),
        fields(relay_index = attempt.relay_index, relay = %endpoint, source_url = %asset.source_url)
    )]
    pub async fn fetch(
        &self,
        endpoint: &RelayEndpoint,
        asset: &Asset,
        attempt: &mut AcquisitionAttempt,
        reporter: &dyn ProgressReporter,
    ) -> Result<MediaBinary, RelayError> {
        let relay_index = attempt.relay_index;
        let url = endpoint.request_url(relay_index, asset)?;

        let response = tokio::time::timeout(self.response_timeout, self.client.get(url).send())
            .await
            .map_err(|_| RelayError::timeout(relay_index))?
            .map_err(|e| RelayError::network(relay_index, e))?;

        let status = response.status();
        attempt.http_status = Some(status.as_u16());
        if status.as_u16() == 403 {
            return Err(RelayError::blocked(relay_index, &asset.source_url));
        }
        if !status.is_success() {
            return Err(RelayError::http_status(
                relay_index,
                &asset.source_url,
                status.as_u16(),
            ));
        }

        let total = declared_content_length(&response);
        attempt.total_bytes = total;
        debug!(total_bytes = ?total, "relay accepted request, streaming body");

        let bytes = accumulate(response.bytes_stream(), attempt, reporter, |e| {
            RelayError::network(relay_index, e)
        })
        .await?;

        if bytes.is_empty() {
            return Err(RelayError::empty_body(relay_index, &asset.source_url));
        }

        Ok(MediaBinary {
            bytes,
            mime_type: asset.kind.mime_type(),
            file_name: asset.target_file_name(),
            relay_index,
        })
    }
}

fn declared_content_length(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Drains `stream` into a buffer, reporting a percentage after each chunk.
///
/// Uses `attempt.total_bytes` as the declared total. Percentages are only
/// reported when that total is known.
pub(crate) async fn accumulate<S, B, E, F>(
    mut stream: S,
    attempt: &mut AcquisitionAttempt,
    reporter: &dyn ProgressReporter,
    map_err: F,
) -> Result<Vec<u8>, RelayError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    F: Fn(E) -> RelayError,
{
    let capacity = attempt
        .total_bytes
        .map_or(0, |t| t.min(MAX_PREALLOCATED_BYTES));
    let mut buffer = Vec::with_capacity(usize::try_from(capacity).unwrap_or(0));
    let mut tracker = PercentTracker::new(attempt.total_bytes);

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(&map_err)?;
        let chunk = chunk.as_ref();
        buffer.extend_from_slice(chunk);

        let percent = tracker.advance(chunk.len());
        attempt.bytes_loaded = tracker.loaded();
        if let Some(percent) = percent {
            reporter.report(ProgressEvent::Transfer { percent });
        }
    }

    Ok(buffer)
}
