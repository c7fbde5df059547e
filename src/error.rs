//! Error types for the relay.
//!
//! Two families live here and they are deliberately kept apart:
//!
//! - [`Rejection`] is the outcome of a decode attempt that did not produce a
//!   record. Rejections are ordinary values, handled inside the pipeline and
//!   never propagated as faults. Corrupted input is the expected steady state.
//! - [`RelayError`] covers operational failures: binding the listener, reading
//!   a feed, writing the archive, loading configuration.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use downlink::RelayError;
//!
//! let error = RelayError::source_failed("gps", "device unplugged");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::schema::Arity;
use crate::types::MessageKind;

/// Result type alias for relay operations.
pub type Result<T, E = RelayError> = std::result::Result<T, E>;

/// Main error type for relay operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    #[error("Failed to bind delivery listener on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Line source '{feed}' failed: {reason}")]
    Source {
        feed: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid configuration: {details}")]
    Config { details: String },

    #[error("Archive write failed for feed '{feed}'")]
    Archive {
        feed: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Delivery to {peer} failed: {reason}")]
    Delivery { peer: SocketAddr, reason: String },
}

impl RelayError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            RelayError::Bind { .. } => false,
            RelayError::Io { .. } => false,
            RelayError::Source { .. } => true,
            RelayError::Config { .. } => false,
            RelayError::Archive { .. } => true,
            RelayError::Delivery { .. } => true,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            RelayError::Bind { .. } => vec![
                "Check that no other process is listening on the port",
                "Verify the listen address in the configuration",
                "Use a non-privileged port (> 1023)",
            ],
            RelayError::Io { .. } => vec![
                "Check the path exists and is readable",
                "Check file and device permissions",
            ],
            RelayError::Source { .. } => vec![
                "Check the receiver is plugged in and powered",
                "Verify the device path has not changed",
                "Confirm the serial line settings outside the relay",
            ],
            RelayError::Config { .. } => vec![
                "Check the YAML syntax",
                "Compare field names against the documented configuration",
            ],
            RelayError::Archive { .. } => vec![
                "Ensure sufficient disk space",
                "Check the archive directory permissions",
            ],
            RelayError::Delivery { .. } => vec![
                "Reconnect the monitoring consumer",
                "Check the consumer is reading fast enough",
            ],
        }
    }

    /// Helper constructor for bind failures.
    pub fn bind_failed(addr: impl Into<String>, source: std::io::Error) -> Self {
        RelayError::Bind { addr: addr.into(), source }
    }

    /// Helper constructor for file and device I/O errors.
    pub fn io_error(path: PathBuf, source: std::io::Error) -> Self {
        RelayError::Io { path, source }
    }

    /// Helper constructor for line source failures.
    pub fn source_failed(feed: impl Into<String>, reason: impl Into<String>) -> Self {
        RelayError::Source { feed: feed.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for line source failures with an underlying cause.
    pub fn source_error(
        feed: impl Into<String>,
        reason: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        RelayError::Source { feed: feed.into(), reason: reason.into(), source: Some(Box::new(source)) }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(details: impl Into<String>) -> Self {
        RelayError::Config { details: details.into() }
    }

    /// Helper constructor for archive write errors.
    pub fn archive_error(feed: impl Into<String>, source: std::io::Error) -> Self {
        RelayError::Archive { feed: feed.into(), source }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Io { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_yaml_ng::Error> for RelayError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        RelayError::Config { details: err.to_string() }
    }
}

/// Why a segment produced no record.
///
/// A rejection always discards the whole segment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("{kind} marker not found")]
    MissingMarker { kind: MessageKind },

    #[error("{kind} expected {expected} tokens, found {found}")]
    StructuralMismatch { kind: MessageKind, expected: Arity, found: usize },

    #[error("{kind} field '{field}' is corrupted: {token:?}")]
    NumericCorruption { kind: MessageKind, field: &'static str, token: String },
}

impl Rejection {
    /// The message kind the segment was classified as.
    pub fn kind(&self) -> MessageKind {
        match self {
            Rejection::MissingMarker { kind }
            | Rejection::StructuralMismatch { kind, .. }
            | Rejection::NumericCorruption { kind, .. } => *kind,
        }
    }
}
