//! Acquisition: relay failover for one asset, and the metered single-item flow.
//!
//! [`AcquisitionOrchestrator`] walks the relay pool in order and returns the
//! first payload. [`DownloadController`] wraps it with a quota check before
//! and a consume after, and tracks each item's state by [`crate::asset::ItemKey`].

mod controller;
mod error;
mod orchestrator;
mod state;

pub use controller::{DownloadController, ItemOutcome};
pub use error::AcquireError;
pub use orchestrator::AcquisitionOrchestrator;
pub use state::{ItemState, ItemTicket, ItemTracker};
