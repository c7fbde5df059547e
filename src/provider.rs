//! Line source trait for raw telemetry feeds

use crate::Result;
use crate::types::{FeedId, RawLine};

/// Trait for raw line sources
///
/// One source per physical feed (a receiver on a serial port, a captured log
/// being replayed). Sources handle their own timing and framing and yield
/// only complete lines with the terminator removed. Device discovery and
/// serial configuration happen outside the relay; a source just reads.
#[async_trait::async_trait]
pub trait LineSource: Send + 'static {
    /// Get the next complete line
    ///
    /// Returns:
    /// - `Ok(Some(line))` - New line available
    /// - `Ok(None)` - Feed ended (normal termination)
    /// - `Err(e)` - Read error; the driver may retry
    async fn next_line(&mut self) -> Result<Option<RawLine>>;

    /// Identifier of the feed this source reads.
    fn feed(&self) -> &FeedId;
}

#[async_trait::async_trait]
impl<S: LineSource + ?Sized> LineSource for Box<S> {
    async fn next_line(&mut self) -> Result<Option<RawLine>> {
        (**self).next_line().await
    }

    fn feed(&self) -> &FeedId {
        (**self).feed()
    }
}
