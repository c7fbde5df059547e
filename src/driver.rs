//! Driver spawns and manages per-feed processing tasks

use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::archive::RawArchive;
use crate::delivery::DeliveryHandle;
use crate::pipeline::Pipeline;
use crate::provider::LineSource;
use crate::types::FeedId;

/// Consecutive source errors tolerated before a feed task gives up.
pub const MAX_SOURCE_ERRORS: u32 = 10;

/// Why a feed task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedOutcome {
    /// The source reported end of input
    Ended,
    /// Shutdown was requested
    Cancelled,
    /// Too many consecutive source errors
    GaveUp,
}

/// Totals reported by a finished feed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedSummary {
    pub feed: FeedId,
    pub outcome: FeedOutcome,
    pub lines: u64,
    pub frames: u64,
    pub source_errors: u64,
    pub archive_failures: u64,
}

/// Driver spawns and manages feed tasks
///
/// Each feed gets one task that owns its source and archive. The task reads a
/// line, archives it, runs it through the pipeline, and hands the frames to
/// the delivery channel without waiting on the consumer.
pub struct Driver;

impl Driver {
    /// Spawn a task for one feed.
    pub fn spawn_feed<S>(
        source: S,
        archive: Option<Box<dyn RawArchive>>,
        pipeline: Pipeline,
        delivery: DeliveryHandle,
        cancel: CancellationToken,
    ) -> JoinHandle<FeedSummary>
    where
        S: LineSource,
    {
        tokio::spawn(Self::feed_task(source, archive, pipeline, delivery, cancel))
    }

    /// Feed task - reads lines until the source ends, fails or is cancelled
    async fn feed_task<S>(
        mut source: S,
        mut archive: Option<Box<dyn RawArchive>>,
        pipeline: Pipeline,
        delivery: DeliveryHandle,
        cancel: CancellationToken,
    ) -> FeedSummary
    where
        S: LineSource,
    {
        let feed = source.feed().clone();
        info!(%feed, "Feed task started");
        let mut summary = FeedSummary {
            feed: feed.clone(),
            outcome: FeedOutcome::Ended,
            lines: 0,
            frames: 0,
            source_errors: 0,
            archive_failures: 0,
        };
        let mut error_count = 0u32;

        loop {
            // Use select to allow cancellation during source.next_line()
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    summary.outcome = FeedOutcome::Cancelled;
                    break;
                }
                result = source.next_line() => result,
            };

            match result {
                Ok(Some(line)) => {
                    error_count = 0;
                    summary.lines += 1;

                    if let Some(sink) = archive.as_mut()
                        && let Err(e) = sink.append(&line).await
                    {
                        summary.archive_failures += 1;
                        warn!(%feed, seq = line.seq, "{}", e);
                    }

                    let frames = pipeline.process(&line);
                    trace!(%feed, seq = line.seq, frames = frames.len(), "Line processed");
                    summary.frames += frames.len() as u64;
                    for frame in frames {
                        delivery.send(frame);
                    }
                }
                Ok(None) => {
                    info!(%feed, lines = summary.lines, "Feed ended");
                    break;
                }
                Err(e) => {
                    // Source error - don't crash on transient failures
                    error_count += 1;
                    summary.source_errors += 1;
                    error!(%feed, "Source error ({}/{}): {}", error_count, MAX_SOURCE_ERRORS, e);

                    if error_count >= MAX_SOURCE_ERRORS {
                        error!(%feed, "Too many source errors, giving up on feed");
                        summary.outcome = FeedOutcome::GaveUp;
                        break;
                    }

                    tokio::select! {
                        _ = cancel.cancelled() => {
                            summary.outcome = FeedOutcome::Cancelled;
                            break;
                        }
                        _ = tokio::time::sleep(backoff(error_count)) => {}
                    }
                }
            }
        }

        if let Some(sink) = archive.as_mut()
            && let Err(e) = sink.flush().await
        {
            debug!(%feed, "Final archive flush failed: {}", e);
        }
        info!(
            %feed,
            outcome = ?summary.outcome,
            lines = summary.lines,
            frames = summary.frames,
            "Feed task ended"
        );
        summary
    }
}

/// Exponential backoff: 50ms, 100ms, 200ms, ... capped at 1.6s
fn backoff(error_count: u32) -> Duration {
    Duration::from_millis(50 * (1 << error_count.saturating_sub(1).min(5)))
}
