//! Media Acquire Core Library
//!
//! Client-side media acquisition: fetches a media binary through an ordered
//! pool of relay endpoints, reports streaming progress, and meters every
//! successful acquisition against a remote usage quota.
//!
//! # Architecture
//!
//! - [`asset`] - Acquirable items and the binaries produced from them
//! - [`relay`] - Relay endpoints and the streaming fetch against one relay
//! - [`acquire`] - Ordered relay failover and the metered single-item flow
//! - [`progress`] - Progress events and reporters
//! - [`quota`] - Quota check/consume against the metering service
//! - [`batch`] - Multi-item acquisition packaged as one zip archive
//! - [`session`] - Identity, persisted login state, cached quota snapshot
//! - [`parse`] - Page URL to asset resolution through the parse API
//!
//! # Flow
//!
//! ```text
//! QuotaGate::check -> AcquisitionOrchestrator::acquire -> QuotaGate::consume
//! ```
//!
//! Consume only ever follows a successful acquisition, so a failed transfer
//! is never billed.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod acquire;
pub mod asset;
pub mod batch;
pub mod http;
pub mod parse;
pub mod progress;
pub mod quota;
pub mod relay;
pub mod session;
mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use acquire::{
    AcquireError, AcquisitionOrchestrator, DownloadController, ItemOutcome, ItemState,
    ItemTracker,
};
pub use asset::{Asset, ItemKey, MediaBinary, MediaKind};
pub use batch::{ArchiveBlob, BatchArchiver, BatchError};
pub use http::HttpTimeouts;
pub use parse::{HttpParseClient, ParseApi, ParseError};
pub use progress::{ChannelReporter, NoopReporter, ProgressEvent, ProgressReporter};
pub use quota::{
    HttpQuotaService, Plan, QuotaCategory, QuotaError, QuotaGate, QuotaService, QuotaSnapshot,
};
pub use relay::{RelayEndpoint, RelayError, RelayPool, StreamingFetcher};
pub use session::{
    ClientSession, HttpIdentityProvider, Identity, IdentityProvider, SessionError, SessionStore,
    UserProfile,
};
