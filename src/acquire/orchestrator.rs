//! Ordered relay failover for one asset.

use tracing::{debug, info, instrument, warn};

use crate::asset::{Asset, MediaBinary};
use crate::progress::{HighWaterReporter, ProgressReporter};
use crate::relay::{AcquisitionAttempt, RelayPool, StreamingFetcher};

use super::AcquireError;

/// Tries each relay in priority order until one yields bytes.
///
/// Relays are attempted strictly sequentially; at most one request is in
/// flight per acquisition. Every failure kind (blocked, bad status,
/// transport error, timeout, empty body) falls through to the next relay.
#[derive(Debug, Clone)]
pub struct AcquisitionOrchestrator {
    pool: RelayPool,
    fetcher: StreamingFetcher,
}

impl AcquisitionOrchestrator {
    /// Creates an orchestrator over `pool`.
    #[must_use]
    pub fn new(pool: RelayPool, fetcher: StreamingFetcher) -> Self {
        Self { pool, fetcher }
    }

    /// Relays this orchestrator tries.
    #[must_use]
    pub fn pool(&self) -> &RelayPool {
        &self.pool
    }

    /// Acquires `asset`, returning the first relay's successful payload.
    ///
    /// Progress from every attempt goes to `reporter`. A relay that takes
    /// over after a mid-stream failure only reports once it passes the
    /// highest percentage already reported.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::RelayPoolExhausted`] when every relay failed
    /// (or the pool is empty).
    #[instrument(skip(self, asset, reporter), fields(source_url = %asset.source_url, relays = self.pool.len()))]
    pub async fn acquire(
        &self,
        asset: &Asset,
        reporter: &dyn ProgressReporter,
    ) -> Result<MediaBinary, AcquireError> {
        let mut attempted: usize = 0;
        let reporter = HighWaterReporter::new(reporter);

        for (relay_index, endpoint) in self.pool.iter() {
            attempted += 1;
            debug!(relay_index, relay = %endpoint, "Trying relay");

            let mut attempt = AcquisitionAttempt::new(relay_index);
            match self
                .fetcher
                .fetch(endpoint, asset, &mut attempt, &reporter)
                .await
            {
                Ok(binary) => {
                    info!(
                        relay_index,
                        bytes = binary.len(),
                        file_name = %binary.file_name,
                        "Acquisition successful"
                    );
                    return Ok(binary);
                }
                Err(err) if err.is_blocked() => {
                    debug!(
                        relay_index,
                        attempt = ?attempt,
                        "Relay blocked by upstream, trying next"
                    );
                }
                Err(err) => {
                    warn!(
                        relay_index,
                        attempt = ?attempt,
                        error = %err,
                        "Relay failed, trying next"
                    );
                }
            }
        }

        Err(AcquireError::pool_exhausted(&asset.source_url, attempted))
    }
}
