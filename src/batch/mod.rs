//! Batch acquisition into a single zip archive.
//!
//! A batch is metered as one unit per item actually acquired: one check for
//! the full count up front, one consume for the successes at the end.

mod archive;

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::acquire::AcquisitionOrchestrator;
use crate::asset::{Asset, MediaBinary};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::quota::{QuotaCategory, QuotaGate};

/// Default file name for a batch archive.
pub const DEFAULT_ARCHIVE_NAME: &str = "media-archive.zip";

/// Errors from [`BatchArchiver::archive_all`].
#[derive(Debug, Error)]
pub enum BatchError {
    /// No items were given.
    #[error("no items to archive")]
    Empty,

    /// The quota check for the whole batch did not pass.
    #[error("quota does not allow downloading {requested} items")]
    QuotaIneligible {
        /// Items requested.
        requested: usize,
    },

    /// Every item failed to acquire.
    #[error("none of the {attempted} items could be acquired")]
    NothingAcquired {
        /// Items attempted.
        attempted: usize,
    },

    /// The batch is too large to meter in one call.
    #[error("batch of {requested} items exceeds the meterable size")]
    TooLarge {
        /// Items requested.
        requested: usize,
    },

    /// Writing the zip failed.
    #[error("failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// A finished archive.
#[derive(Clone, PartialEq, Eq)]
pub struct ArchiveBlob {
    /// Suggested file name for the archive.
    pub file_name: String,
    /// Zip bytes.
    pub bytes: Vec<u8>,
    /// Entry names, in archive order.
    pub entries: Vec<String>,
    /// Source URLs of items that could not be acquired.
    pub skipped: Vec<String>,
}

impl std::fmt::Debug for ArchiveBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveBlob")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .field("entries", &self.entries)
            .field("skipped", &self.skipped)
            .finish()
    }
}

/// Acquires many assets and packs the successes into one zip.
#[derive(Debug, Clone)]
pub struct BatchArchiver {
    orchestrator: Arc<AcquisitionOrchestrator>,
    gate: QuotaGate,
    archive_name: String,
}

impl BatchArchiver {
    #[must_use]
    pub fn new(orchestrator: Arc<AcquisitionOrchestrator>, gate: QuotaGate) -> Self {
        Self {
            orchestrator,
            gate,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }

    /// Overrides the archive file name.
    #[must_use]
    pub fn with_archive_name(mut self, name: impl Into<String>) -> Self {
        self.archive_name = name.into();
        self
    }

    /// Acquires `items` one after another and zips the ones that succeeded.
    ///
    /// Emits [`ProgressEvent::Batch`] before each item, plus the item's own
    /// transfer events. Individual failures are skipped. Usage is consumed
    /// once, for the number of successes; a failed consume is logged for
    /// reconciliation and the archive is still returned.
    ///
    /// # Errors
    ///
    /// - [`BatchError::Empty`] for an empty list; the quota service is not called
    /// - [`BatchError::QuotaIneligible`] when the up-front check fails
    /// - [`BatchError::NothingAcquired`] when no item succeeded; nothing is consumed
    /// - [`BatchError::Archive`] when zip writing fails
    #[instrument(skip(self, items, reporter), fields(items = items.len()))]
    pub async fn archive_all(
        &self,
        items: &[Asset],
        reporter: &dyn ProgressReporter,
    ) -> Result<ArchiveBlob, BatchError> {
        if items.is_empty() {
            return Err(BatchError::Empty);
        }
        let requested = u32::try_from(items.len()).map_err(|_| BatchError::TooLarge {
            requested: items.len(),
        })?;

        if !self.gate.check(QuotaCategory::Download, requested).await {
            return Err(BatchError::QuotaIneligible {
                requested: items.len(),
            });
        }

        let total = items.len();
        let mut acquired: Vec<MediaBinary> = Vec::with_capacity(total);
        let mut skipped = Vec::new();

        for (index, asset) in items.iter().enumerate() {
            reporter.report(ProgressEvent::Batch {
                current: index + 1,
                total,
            });
            match self.orchestrator.acquire(asset, reporter).await {
                Ok(binary) => acquired.push(binary),
                Err(error) => {
                    warn!(
                        source_url = %asset.source_url,
                        error = %error,
                        "Skipping item that could not be acquired"
                    );
                    skipped.push(asset.source_url.clone());
                }
            }
        }

        if acquired.is_empty() {
            return Err(BatchError::NothingAcquired { attempted: total });
        }

        let (bytes, entries) = archive::pack(&acquired)?;

        // Bounded by `requested`, which already fit in u32.
        let successes = u32::try_from(acquired.len()).unwrap_or(requested);
        match self.gate.consume(QuotaCategory::Download, successes).await {
            Ok(outcome) if outcome.success => {}
            Ok(_) => warn!(
                reconcile = true,
                units = successes,
                "Quota consume refused after batch archive"
            ),
            Err(error) => warn!(
                reconcile = true,
                units = successes,
                error = %error,
                "Quota consume failed after batch archive"
            ),
        }

        info!(
            entries = entries.len(),
            skipped = skipped.len(),
            bytes = bytes.len(),
            "Batch archive ready"
        );
        Ok(ArchiveBlob {
            file_name: self.archive_name.clone(),
            bytes,
            entries,
            skipped,
        })
    }
}
