//! Raw input lines and classified segments

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;

use super::MessageKind;

/// Identifier of the physical feed a line arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedId(Arc<str>);

impl FeedId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FeedId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for FeedId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl std::fmt::Display for FeedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One complete line as delivered by a line source.
///
/// The bytes are kept exactly as received (minus the line terminator) so the
/// archive sees what came off the wire. Decoding works on the lossy text view.
#[derive(Debug, Clone)]
pub struct RawLine {
    /// Feed the line arrived on
    pub feed: FeedId,

    /// Per-feed arrival order, starting at 0
    pub seq: u64,

    /// Line bytes without the terminator
    pub bytes: Arc<[u8]>,
}

impl RawLine {
    pub fn new(feed: FeedId, seq: u64, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self { feed, seq, bytes: bytes.into() }
    }

    /// Text view; invalid UTF-8 sequences become U+FFFD.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A line, or one half of a compound line, tagged with the format it matched.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedSegment {
    pub kind: MessageKind,
    pub feed: FeedId,
    pub seq: u64,
    /// Segment text starting at the format's marker
    pub text: String,
}
