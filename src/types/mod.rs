//! Core types flowing through the relay pipeline.
//!
//! ## Lifecycle
//!
//! - [`RawLine`] is created per input line and lives for one
//!   classify → decode → encode pass.
//! - [`ClassifiedSegment`] is a line (or half of a compound line) tagged with
//!   the [`MessageKind`] whose marker it carries.
//! - [`DecodedRecord`] holds validated, unit-converted fields. It only exists
//!   for input that passed every check.
//! - [`BinaryFrame`] is the fixed-layout wire encoding of one record.
//!
//! ## Usage Example
//!
//! ```rust
//! use downlink::types::{FeedId, RawLine};
//! use downlink::{ClassifierConfig, Decoder, classify, encode};
//!
//! let line = RawLine::new(FeedId::from("raven"), 0, b"R:2864:-13:-75:7698:3:0:0:-70:5:8".to_vec());
//! let decoder = Decoder::default();
//!
//! for segment in classify(&line, &ClassifierConfig::default()) {
//!     let record = decoder.decode(&segment).expect("fixture decodes");
//!     let frame = encode(&record);
//!     assert_eq!(frame.tag(), 14);
//! }
//! ```

mod frame;
mod kind;
mod line;
mod pyro;
mod record;
mod value;

pub use frame::BinaryFrame;
pub use kind::MessageKind;
pub use line::{ClassifiedSegment, FeedId, RawLine};
pub use pyro::{PyroChannel, PyroStatus};
pub use record::{AltimeterA, AltimeterB, DecodedRecord, GpsFix, LinkHealth, LinkQuality};
pub use value::{FromValue, Value, WireType};
