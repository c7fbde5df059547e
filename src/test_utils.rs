//! Test utilities shared by unit tests, integration tests and benches
//!
//! Provides canonical fixture lines for every format and an in-memory
//! [`LineSource`] with scriptable failures.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;

use tokio::sync::mpsc;

use crate::Result;
use crate::error::RelayError;
use crate::provider::LineSource;
use crate::types::{BinaryFrame, FeedId, MessageKind, RawLine};

/// Known-good lines, one per format, as captured from the receivers.
pub mod fixtures {
    pub const ALTIMETER_A: &str = "R:2864:-13:-75:7698:3:0:0:-70:5:8";

    pub const ALTIMETER_B: &str = "T:153012:1523:-12:84:CCO:4:-81:7:9";

    pub const GPS_STAT: &str = "@ GPS_STAT 202 0000 00 00 03:00:59.920 CRC_OK TRK FthrWt04072 Alt 000114 lt +37.123456 ln -122.123450 Vel +0000 +069 +0000 Fix 3 # 21 14 10 5 000_00_00 000_00_00 000_00_00 000_00_00 000_00_00 CRC: 7C9A";

    pub const RX_NOMTK: &str = "@ RX_NOMTK 202 0000 00 00 03:00:59.920 CRC_OK  Rx NomTrk FthrWt04072 PkRx 10636 PkTx 10959 RSSI -077 SNR +06 AckRx 10598 AckTx 10645 RSSI -085 SNR  +6 SF 10 frq 919000000 trk_B_V 3972   +0 C CRC: 5D9B";

    /// Altimeter-A and altimeter-B packets merged by the receiver, sharing
    /// one link-quality tail.
    pub const COMPOUND: &str = "R:2864:-13:-75:7698:3:0:0:T:153012:1523:-12:84:CCO:4:-70:5:8";

    /// Every single-packet fixture with its kind.
    pub const ALL: [(crate::types::MessageKind, &str); 4] = [
        (crate::types::MessageKind::AltimeterA, ALTIMETER_A),
        (crate::types::MessageKind::AltimeterB, ALTIMETER_B),
        (crate::types::MessageKind::GpsTracker, GPS_STAT),
        (crate::types::MessageKind::LinkHealth, RX_NOMTK),
    ];
}

/// Wrap text as a raw line on the `test` feed.
pub fn raw_line(text: &str) -> RawLine {
    RawLine::new(FeedId::from("test"), 0, text.as_bytes().to_vec())
}

/// Encoded altimeter-A frame whose sample counter is `count`.
pub fn altimeter_frame(count: u32) -> BinaryFrame {
    let text = format!("R:{count}:-13:-75:7698:3:0:0:-70:5:8");
    match crate::Decoder::default().decode_text(MessageKind::AltimeterA, &text) {
        Ok(record) => crate::encode(&record),
        Err(rejection) => panic!("altimeter fixture rejected: {}", rejection),
    }
}

/// What a [`VecSource`] does after its scripted items run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tail {
    End,
    Fail,
    Pending,
}

/// In-memory line source.
pub struct VecSource {
    feed: FeedId,
    items: VecDeque<Result<Vec<u8>>>,
    tail: Tail,
    seq: u64,
}

impl VecSource {
    /// Yields `lines` in order, then ends.
    pub fn new<I, L>(feed: &str, lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        Self {
            feed: FeedId::from(feed),
            items: lines.into_iter().map(|l| Ok(l.as_ref().to_vec())).collect(),
            tail: Tail::End,
            seq: 0,
        }
    }

    /// Fails on every read.
    pub fn failing(feed: &str) -> Self {
        Self { tail: Tail::Fail, ..Self::new::<[&str; 0], &str>(feed, []) }
    }

    /// Never yields.
    pub fn pending(feed: &str) -> Self {
        Self { tail: Tail::Pending, ..Self::new::<[&str; 0], &str>(feed, []) }
    }

    /// Returns `error` before the scripted lines.
    pub fn with_leading_error(mut self, error: RelayError) -> Self {
        self.items.push_front(Err(error));
        self
    }
}

#[async_trait::async_trait]
impl LineSource for VecSource {
    async fn next_line(&mut self) -> Result<Option<RawLine>> {
        match self.items.pop_front() {
            Some(Ok(bytes)) => {
                let line = RawLine::new(self.feed.clone(), self.seq, bytes);
                self.seq += 1;
                Ok(Some(line))
            }
            Some(Err(e)) => Err(e),
            None => match self.tail {
                Tail::End => Ok(None),
                Tail::Fail => Err(RelayError::source_failed(self.feed.as_str(), "device unplugged")),
                Tail::Pending => futures::future::pending().await,
            },
        }
    }

    fn feed(&self) -> &FeedId {
        &self.feed
    }
}

/// Line source fed from a channel, for tests that need to control when
/// lines arrive. Ends when every sender is dropped.
pub struct ChannelSource {
    feed: FeedId,
    lines: mpsc::UnboundedReceiver<String>,
    seq: u64,
}

impl ChannelSource {
    pub fn new(feed: &str) -> (mpsc::UnboundedSender<String>, Self) {
        let (tx, lines) = mpsc::unbounded_channel();
        (tx, Self { feed: FeedId::from(feed), lines, seq: 0 })
    }
}

#[async_trait::async_trait]
impl LineSource for ChannelSource {
    async fn next_line(&mut self) -> Result<Option<RawLine>> {
        let Some(text) = self.lines.recv().await else {
            return Ok(None);
        };
        let line = RawLine::new(self.feed.clone(), self.seq, text.into_bytes());
        self.seq += 1;
        Ok(Some(line))
    }

    fn feed(&self) -> &FeedId {
        &self.feed
    }
}
