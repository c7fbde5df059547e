//! Replay source for captured feeds

use std::path::Path;
use tokio::fs::File;
use tokio::io::BufReader;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::Result;
use crate::provider::LineSource;
use crate::providers::reader::ReaderSource;
use crate::types::{FeedId, RawLine};

/// Default replay rate in lines per second.
pub const DEFAULT_REPLAY_RATE: f64 = 10.0;

/// Slowest accepted replay rate in lines per second.
pub const MIN_REPLAY_RATE: f64 = 0.01;

/// Fastest accepted replay rate in lines per second.
pub const MAX_REPLAY_RATE: f64 = 100_000.0;

/// Replays a captured feed at a fixed line rate.
///
/// Accepts plain captures and files written by [`crate::archive::FileArchive`];
/// the archive's `<unix-millis>\t` prefix is stripped so replayed lines match
/// what originally came off the wire.
pub struct ReplaySource {
    /// Capture file reader
    reader: ReaderSource<BufReader<File>>,

    /// Lines per second at 1x speed
    rate_hz: f64,

    /// Playback speed multiplier (1.0 = normal, 2.0 = double speed)
    speed: f64,

    /// Line pacing interval
    interval: Interval,
}

impl ReplaySource {
    /// Open a capture file for replay at `rate_hz` lines per second.
    pub async fn open(path: impl AsRef<Path>, feed: FeedId, rate_hz: f64) -> Result<Self> {
        let path = path.as_ref();
        let reader = ReaderSource::open(path, feed).await?;
        let rate_hz = if rate_hz.is_finite() && rate_hz > 0.0 { rate_hz } else { DEFAULT_REPLAY_RATE };

        info!("Replaying {} at {} lines/s", path.display(), rate_hz);
        Ok(Self { reader, rate_hz, speed: 1.0, interval: pacing(rate_hz) })
    }

    /// Set playback speed
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = if speed.is_nan() { 1.0 } else { speed.clamp(0.1, 10.0) };
        self.interval = pacing(self.rate_hz * self.speed);
        debug!("Playback speed set to {}x", self.speed);
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Lines replayed so far.
    pub fn lines_read(&self) -> u64 {
        self.reader.lines_read()
    }
}

/// Interval for a line rate, clamped to the accepted range.
fn pacing(lines_per_second: f64) -> Interval {
    let rate = if lines_per_second.is_nan() {
        DEFAULT_REPLAY_RATE
    } else {
        lines_per_second.clamp(MIN_REPLAY_RATE, MAX_REPLAY_RATE)
    };
    let mut interval = interval(Duration::from_secs_f64(1.0 / rate));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Remove a leading `<digits>\t` archive timestamp, if present.
fn strip_archive_prefix(line: &[u8]) -> &[u8] {
    let digits = line.iter().take_while(|b| b.is_ascii_digit()).count();
    match line.get(digits) {
        Some(b'\t') if digits > 0 => &line[digits + 1..],
        _ => line,
    }
}

#[async_trait::async_trait]
impl LineSource for ReplaySource {
    async fn next_line(&mut self) -> Result<Option<RawLine>> {
        // Wait for next line timing (pacing)
        self.interval.tick().await;

        let bytes = match self.reader.read_raw().await? {
            Some(raw) => strip_archive_prefix(raw).to_vec(),
            None => {
                debug!("Reached end of replay");
                return Ok(None);
            }
        };
        let seq = self.reader.next_seq();
        trace!(feed = %self.reader.feed(), seq, "Replayed line");
        Ok(Some(RawLine::new(self.reader.feed().clone(), seq, bytes)))
    }

    fn feed(&self) -> &FeedId {
        self.reader.feed()
    }
}
