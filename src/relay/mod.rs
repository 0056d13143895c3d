//! Relay endpoints and the streaming fetch against one of them.
//!
//! A relay is an intermediary HTTP endpoint that fetches a media byte stream
//! from an upstream source on our behalf and forwards it. Relays are tried in
//! a fixed priority order by [`crate::acquire::AcquisitionOrchestrator`].
//!
//! # Example
//!
//! ```no_run
//! use media_acquire::asset::Asset;
//! use media_acquire::http::HttpTimeouts;
//! use media_acquire::progress::NoopReporter;
//! use media_acquire::relay::{AcquisitionAttempt, RelayEndpoint, StreamingFetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = StreamingFetcher::new(HttpTimeouts::default())?;
//! let relay = RelayEndpoint::new("https://relay.example/api/stream");
//! let asset = Asset::new("Clip", "https://video.example/watch?v=1");
//! let mut attempt = AcquisitionAttempt::new(0);
//! let binary = fetcher.fetch(&relay, &asset, &mut attempt, &NoopReporter).await?;
//! println!("{} bytes", binary.len());
//! # Ok(())
//! # }
//! ```

pub mod constants;
mod error;
mod fetcher;
mod pool;

pub use error::RelayError;
pub use fetcher::{AcquisitionAttempt, StreamingFetcher};
pub use pool::{RelayEndpoint, RelayPool};
