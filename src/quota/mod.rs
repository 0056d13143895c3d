//! Usage metering: eligibility checks before work, consumption after success.
//!
//! The quota service is authoritative. The client caches the last snapshot
//! the service returned and never decrements counters locally.

mod client;
mod error;
mod gate;
mod snapshot;

pub use client::{CheckResponse, ConsumeResponse, HttpQuotaService, QuotaService};
pub use error::QuotaError;
pub use gate::{ConsumeOutcome, QuotaGate};
pub use snapshot::{Plan, QuotaCategory, QuotaSnapshot};
