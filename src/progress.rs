//! Progress events emitted while media streams in.
//!
//! A single acquisition yields zero or more [`ProgressEvent::Transfer`]
//! events with non-decreasing percentages, across relay fallback as well,
//! followed by exactly one terminal
//! result returned from the acquisition call itself. Batch runs interleave
//! [`ProgressEvent::Batch`] markers before each item.

use std::sync::atomic::{AtomicU16, Ordering};

use tokio::sync::mpsc;

/// A single progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Percent of the declared content length received so far (0-100).
    Transfer {
        /// Rounded percentage.
        percent: u8,
    },
    /// A batch is about to acquire item `current` of `total` (1-indexed).
    Batch {
        /// 1-indexed position of the item being acquired.
        current: usize,
        /// Number of items in the batch.
        total: usize,
    },
}

/// Receives progress events.
///
/// Implementations must be cheap; they are invoked inline after every
/// received chunk.
pub trait ProgressReporter: Send + Sync {
    /// Handles one event.
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event);
    }
}

/// Reporter that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}

/// Reporter that forwards events into an unbounded channel.
///
/// The receiving half can be consumed as an async stream of events while
/// the acquisition future runs elsewhere.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelReporter {
    /// Creates a reporter and the receiver its events arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is watching anymore.
        let _ = self.tx.send(event);
    }
}

/// Forwards events to `inner`, dropping transfer percentages that do not
/// exceed the highest one already forwarded.
///
/// One instance spans a whole acquisition, so a relay that fails
/// mid-stream followed by a relay that starts over from zero never moves
/// the reported percentage backwards.
pub(crate) struct HighWaterReporter<'a> {
    inner: &'a dyn ProgressReporter,
    // Highest forwarded percent plus one; zero until the first transfer event.
    mark: AtomicU16,
}

impl<'a> HighWaterReporter<'a> {
    pub(crate) fn new(inner: &'a dyn ProgressReporter) -> Self {
        Self {
            inner,
            mark: AtomicU16::new(0),
        }
    }
}

impl ProgressReporter for HighWaterReporter<'_> {
    fn report(&self, event: ProgressEvent) {
        if let ProgressEvent::Transfer { percent } = event {
            let candidate = u16::from(percent) + 1;
            if self.mark.fetch_max(candidate, Ordering::Relaxed) >= candidate {
                return;
            }
        }
        self.inner.report(event);
    }
}

/// Tracks bytes received for one stream and derives percentages.
///
/// Percentages are only produced when the total is known and non-zero, and
/// are only produced when they increase.
#[derive(Debug, Clone, Default)]
pub(crate) struct PercentTracker {
    total: Option<u64>,
    loaded: u64,
    last: Option<u8>,
}

impl PercentTracker {
    pub(crate) fn new(total: Option<u64>) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            loaded: 0,
            last: None,
        }
    }

    pub(crate) fn loaded(&self) -> u64 {
        self.loaded
    }

    /// Records `chunk_len` more bytes, returning a percentage to report.
    pub(crate) fn advance(&mut self, chunk_len: usize) -> Option<u8> {
        self.loaded = self.loaded.saturating_add(chunk_len as u64);
        let total = self.total?;
        let percent = rounded_percent(self.loaded, total);
        if self.last.is_some_and(|last| percent <= last) {
            return None;
        }
        self.last = Some(percent);
        Some(percent)
    }
}

/// `round(loaded / total * 100)`, capped at 100.
fn rounded_percent(loaded: u64, total: u64) -> u8 {
    let total = u128::from(total);
    let scaled = (u128::from(loaded) * 100 + total / 2) / total;
    u8::try_from(scaled.min(100)).unwrap_or(100)
}
