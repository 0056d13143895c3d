//! Single-item download flow: check quota, acquire, consume.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::asset::{Asset, MediaBinary};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::quota::{QuotaCategory, QuotaGate};

use super::state::{ItemState, ItemTicket, ItemTracker};
use super::{AcquireError, AcquisitionOrchestrator};

/// How a single-item download ended.
#[derive(Debug)]
pub enum ItemOutcome {
    /// Acquired; usage was recorded (or a reconciliation warning was logged).
    Saved(MediaBinary),
    /// The quota check did not allow the download. Nothing was acquired.
    Upsell,
    /// Every relay failed. No usage was recorded and the item is idle again.
    Failed(AcquireError),
    /// A run for the same item was already in progress.
    Busy,
    /// The run was abandoned before it finished; its result was discarded.
    Abandoned,
}

/// Forwards progress to the caller and mirrors it into the item's state.
struct TrackingReporter<'a> {
    ticket: &'a ItemTicket,
    inner: &'a dyn ProgressReporter,
}

impl ProgressReporter for TrackingReporter<'_> {
    fn report(&self, event: ProgressEvent) {
        if let ProgressEvent::Transfer { percent } = event {
            self.ticket.set(ItemState::Downloading {
                percent: Some(percent),
            });
        }
        self.inner.report(event);
    }
}

/// Drives single-item downloads with per-item state.
#[derive(Debug, Clone)]
pub struct DownloadController {
    orchestrator: Arc<AcquisitionOrchestrator>,
    gate: QuotaGate,
    tracker: ItemTracker,
}

impl DownloadController {
    #[must_use]
    pub fn new(orchestrator: Arc<AcquisitionOrchestrator>, gate: QuotaGate) -> Self {
        Self {
            orchestrator,
            gate,
            tracker: ItemTracker::new(),
        }
    }

    /// Per-item states, for display and for [`ItemTracker::abandon`].
    #[must_use]
    pub fn tracker(&self) -> &ItemTracker {
        &self.tracker
    }

    /// Downloads one asset.
    ///
    /// Quota is checked for one unit before any relay is contacted and
    /// consumed only after bytes were acquired by a run that is still
    /// current. A consume failure after a successful acquisition still
    /// returns [`ItemOutcome::Saved`].
    #[instrument(skip(self, asset, reporter), fields(key = %asset.source_url))]
    pub async fn download(&self, asset: &Asset, reporter: &dyn ProgressReporter) -> ItemOutcome {
        let Some(ticket) = self.tracker.begin(&asset.key()) else {
            debug!("Item already in progress, ignoring");
            return ItemOutcome::Busy;
        };

        let allowed = self.gate.check(QuotaCategory::Download, 1).await;
        if !ticket.is_current() {
            return ItemOutcome::Abandoned;
        }
        if !allowed {
            info!("Quota check refused download");
            ticket.finish();
            return ItemOutcome::Upsell;
        }

        ticket.set(ItemState::Downloading { percent: None });
        let tracking = TrackingReporter {
            ticket: &ticket,
            inner: reporter,
        };
        let binary = match self.orchestrator.acquire(asset, &tracking).await {
            Ok(binary) => binary,
            Err(err) => {
                ticket.finish();
                return ItemOutcome::Failed(err);
            }
        };

        if !ticket.set(ItemState::Consuming) {
            info!("Run abandoned after acquisition, discarding without consume");
            return ItemOutcome::Abandoned;
        }

        match self.gate.consume(QuotaCategory::Download, 1).await {
            Ok(outcome) if outcome.success => {}
            Ok(_) => warn!(
                reconcile = true,
                units = 1,
                "Quota consume refused after successful download"
            ),
            Err(error) => warn!(
                reconcile = true,
                units = 1,
                error = %error,
                "Quota consume failed after successful download"
            ),
        }

        ticket.finish();
        ItemOutcome::Saved(binary)
    }
}
