//! Error types for acquisition.

use thiserror::Error;

/// Errors from [`super::AcquisitionOrchestrator::acquire`].
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Every relay in the pool failed for this asset.
    #[error("download nodes unavailable ({attempted} tried) for {source_url}")]
    RelayPoolExhausted {
        /// Source the acquisition was for.
        source_url: String,
        /// How many relays were attempted.
        attempted: usize,
    },
}

impl AcquireError {
    /// Creates a pool-exhausted error.
    pub fn pool_exhausted(source_url: impl Into<String>, attempted: usize) -> Self {
        Self::RelayPoolExhausted {
            source_url: source_url.into(),
            attempted,
        }
    }
}
