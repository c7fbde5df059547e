//! Ground-station relay for flight-instrument telemetry.
//!
//! Downlink reads noisy, line-oriented ASCII telemetry from several airborne
//! instruments, validates and decodes every line, and re-encodes the result
//! into fixed-layout binary frames streamed to one monitoring consumer over
//! TCP.
//!
//! # Features
//!
//! - **Table-driven decoding**: four line formats described as data in
//!   [`schema::formats`], decoded by one [`Decoder`]
//! - **Corruption tolerant**: a damaged record is rejected whole, never
//!   partially interpreted, and never faults the pipeline
//! - **Fixed wire layouts**: packed little-endian frames, versioned in
//!   [`schema::wire`]
//! - **Resilient delivery**: consumers come and go; the relay keeps decoding
//!
//! # Pipeline
//!
//! ```text
//! LineSource ─► classify ─► Decoder ─► encode ─► DeliveryChannel ─► consumer
//!     │
//!     └─► RawArchive (every line, whatever the decode outcome)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use downlink::{Relay, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> downlink::Result<()> {
//!     downlink::logging::init();
//!     let config = RelayConfig::from_yaml_str(
//!         "feeds:\n  - id: raven\n    path: /dev/ttyUSB0\n",
//!     )?;
//!     let mut relay = Relay::start(config).await?;
//!     relay.feeds_finished().await;
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Line processing
pub mod classify;
pub mod decode;
pub mod encode;
pub mod pipeline;
pub mod schema;

// Feed and delivery tasks
pub mod archive;
pub mod delivery;
pub mod driver;
pub mod provider;
pub mod providers;
mod relay;

// Setup
pub mod config;
pub mod logging;

// Core exports
pub use error::*;
pub use types::*;

// Processing exports
pub use classify::{Classification, ClassifierConfig, classify, classify_line};
pub use decode::Decoder;
pub use encode::encode;
pub use pipeline::{Pipeline, PipelineSnapshot};

// Runtime exports
pub use config::{FeedConfig, RelayConfig};
pub use delivery::{DeliveryConfig, DeliveryHandle, DeliverySnapshot, DeliveryState};
pub use driver::{FeedOutcome, FeedSummary};
pub use provider::LineSource;
pub use relay::{Relay, RelayStats};
