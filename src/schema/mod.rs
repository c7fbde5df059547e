//! Schema tables
//!
//! Two tables drive the pipeline:
//! - [`formats`] describes each ASCII line format: marker, separator, arity,
//!   cleanup rules and the token index → field mapping with scale factors.
//! - [`wire`] describes each binary frame: tag and ordered fixed-width fields.
//!
//! Both are versioned together by [`wire::SCHEMA_VERSION`].

pub mod formats;
pub mod wire;

pub use formats::{
    Arity, DEFAULT_TRACKER_ID, FORMATS, FieldKind, FieldSpec, FormatSchema, Gate, Normalizer,
    Separator, format_for,
};
pub use wire::{
    FrameLayout, LAYOUTS, SCHEMA_VERSION, WireField, layout_for_kind, layout_for_tag,
    peek_frame_len,
};
