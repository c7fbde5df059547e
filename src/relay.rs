//! Running relay: feed tasks plus the delivery channel

use std::net::SocketAddr;

use futures::Stream;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::Result;
use crate::archive::{FileArchive, RawArchive};
use crate::config::RelayConfig;
use crate::delivery::{DeliveryChannel, DeliveryHandle, DeliverySnapshot, DeliveryState};
use crate::driver::{Driver, FeedSummary};
use crate::pipeline::{Pipeline, PipelineSnapshot};
use crate::provider::LineSource;
use crate::providers::{ReaderSource, ReplaySource};

/// Combined counters for a running relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    pub pipeline: PipelineSnapshot,
    pub delivery: DeliverySnapshot,
}

/// A running relay.
///
/// Owns one task per feed and the delivery task. Dropping the relay cancels
/// all of them; [`Relay::shutdown`] does the same but waits for the tasks and
/// returns the per-feed totals.
///
/// # Example
///
/// ```rust,no_run
/// use downlink::{Relay, RelayConfig};
///
/// #[tokio::main]
/// async fn main() -> downlink::Result<()> {
///     let config = RelayConfig::from_file("downlink.yaml")?;
///     let relay = Relay::start(config).await?;
///     println!("Consumer port: {}", relay.local_addr());
///
///     tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
///     for summary in relay.shutdown().await {
///         println!("{}: {} lines, {} frames", summary.feed, summary.lines, summary.frames);
///     }
///     Ok(())
/// }
/// ```
pub struct Relay {
    /// Address the consumer connects to
    local_addr: SocketAddr,

    /// Producer handle, also the window onto delivery state
    delivery: DeliveryHandle,

    /// Shared pipeline (clones share counters)
    pipeline: Pipeline,

    /// One task per feed
    feeds: Vec<JoinHandle<FeedSummary>>,

    /// Delivery writer task
    delivery_task: Option<JoinHandle<()>>,

    /// Cancellation token for stopping tasks
    cancel: CancellationToken,
}

impl Relay {
    /// Start a relay from configuration.
    ///
    /// Opens every configured feed, reading or replaying as configured, then
    /// hands them to [`Relay::with_sources`]. Any feed that cannot be opened
    /// fails the whole start.
    pub async fn start(config: RelayConfig) -> Result<Self> {
        config.validate()?;

        let mut sources: Vec<Box<dyn LineSource>> = Vec::with_capacity(config.feeds.len());
        for feed in &config.feeds {
            let id = feed.feed_id();
            let source: Box<dyn LineSource> = match feed.replay_rate {
                Some(rate) => Box::new(ReplaySource::open(&feed.path, id, rate).await?),
                None => Box::new(ReaderSource::open(&feed.path, id).await?),
            };
            sources.push(source);
        }
        Self::with_sources(&config, sources).await
    }

    /// Start a relay over caller-supplied sources.
    ///
    /// Feeds and archive settings come from `sources` and `config.archive_dir`;
    /// `config.feeds` is ignored. The listener is bound and every archive
    /// opened before any task is spawned.
    pub async fn with_sources<S>(
        config: &RelayConfig,
        sources: impl IntoIterator<Item = S>,
    ) -> Result<Self>
    where
        S: LineSource,
    {
        let channel = DeliveryChannel::bind(&config.delivery()).await?;
        let local_addr = channel.local_addr();
        let delivery = channel.handle();
        let pipeline = Pipeline::new(config.classifier());

        let mut staged = Vec::new();
        for source in sources {
            let archive: Option<Box<dyn RawArchive>> = match &config.archive_dir {
                Some(dir) => Some(Box::new(FileArchive::open(dir, source.feed()).await?)),
                None => None,
            };
            staged.push((source, archive));
        }

        let cancel = CancellationToken::new();
        let delivery_task = channel.spawn(cancel.clone());
        let feeds: Vec<_> = staged
            .into_iter()
            .map(|(source, archive)| {
                Driver::spawn_feed(source, archive, pipeline.clone(), delivery.clone(), cancel.clone())
            })
            .collect();

        info!(addr = %local_addr, feeds = feeds.len(), "Relay started");
        Ok(Self { local_addr, delivery, pipeline, feeds, delivery_task: Some(delivery_task), cancel })
    }

    /// Address the delivery listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current delivery state.
    pub fn state(&self) -> DeliveryState {
        self.delivery.state()
    }

    /// Delivery state changes as a stream
    pub fn state_updates(&self) -> impl Stream<Item = DeliveryState> + 'static {
        self.delivery.state_updates()
    }

    /// Producer handle, for injecting frames from outside the feed tasks.
    pub fn delivery(&self) -> &DeliveryHandle {
        &self.delivery
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats { pipeline: self.pipeline.stats().snapshot(), delivery: self.delivery.stats() }
    }

    /// Wait for every feed to end on its own and return their totals.
    ///
    /// Delivery keeps running, so frames still queued reach a connected
    /// consumer. Returns immediately if there are no feeds.
    pub async fn feeds_finished(&mut self) -> Vec<FeedSummary> {
        join_feeds(std::mem::take(&mut self.feeds)).await
    }

    /// Cancel every task and wait for them to stop.
    pub async fn shutdown(mut self) -> Vec<FeedSummary> {
        info!("Shutting down relay");
        self.cancel.cancel();
        let summaries = join_feeds(std::mem::take(&mut self.feeds)).await;
        if let Some(task) = self.delivery_task.take()
            && let Err(e) = task.await
        {
            error!("Delivery task failed: {}", e);
        }
        summaries
    }
}

async fn join_feeds(feeds: Vec<JoinHandle<FeedSummary>>) -> Vec<FeedSummary> {
    futures::future::join_all(feeds)
        .await
        .into_iter()
        .filter_map(|joined| match joined {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!("Feed task failed: {}", e);
                None
            }
        })
        .collect()
}

impl Drop for Relay {
    fn drop(&mut self) {
        debug!("Dropping relay");
        // Cancel tasks on drop for clean shutdown
        self.cancel.cancel();
    }
}
