//! TCP delivery of binary frames to the monitoring consumer
//!
//! The channel is an explicit two-state machine owned by a single task:
//!
//! ```text
//! Listening ──accept──▶ Connected { peer }
//!     ▲                      │
//!     └── write error, write timeout, peer hangup
//! ```
//!
//! Producers never block. They push frames into a bounded broadcast queue;
//! when the queue overflows the oldest frames are lost and counted. While no
//! consumer is connected the task keeps draining the queue and discards what
//! it reads, so a consumer that connects late only sees frames produced after
//! it arrived. A frame whose write fails is dropped, never retried.
//!
//! Hangup is detected by a zero-byte read. A consumer that half-closes its
//! write side is therefore treated as gone even if it is still reading.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::Stream;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{RelayError, Result};
use crate::schema::SCHEMA_VERSION;
use crate::types::BinaryFrame;

#[cfg(test)]
mod tests;

/// Default listen address for the consumer connection.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:23200";
/// Default producer queue depth, in frames.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
/// Default bound on a single frame write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Listener and queue settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryConfig {
    pub listen: String,
    pub queue_capacity: usize,
    pub write_timeout: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN_ADDR.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

/// Connection state of the delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeliveryState {
    /// Waiting for a consumer; frames are discarded
    Listening,
    /// Streaming frames to `peer`
    Connected { peer: SocketAddr },
}

impl DeliveryState {
    pub fn is_connected(&self) -> bool {
        matches!(self, DeliveryState::Connected { .. })
    }
}

/// Point-in-time copy of the delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliverySnapshot {
    /// Frames accepted into the queue
    pub frames_queued: u64,
    /// Frames written to a consumer
    pub frames_sent: u64,
    pub bytes_sent: u64,
    /// Frames discarded because no consumer was connected
    pub frames_discarded: u64,
    /// Frames lost to queue overflow
    pub frames_overflowed: u64,
    /// Frames submitted after the delivery task stopped
    pub frames_rejected: u64,
    /// Frames lost with a failed or timed-out write
    pub frames_failed: u64,
    /// Connections lost to a write error, write timeout or hangup
    pub send_failures: u64,
    /// Consumers accepted
    pub connections: u64,
}

/// Shared delivery counters.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    frames_queued: AtomicU64,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    frames_discarded: AtomicU64,
    frames_overflowed: AtomicU64,
    frames_rejected: AtomicU64,
    frames_failed: AtomicU64,
    send_failures: AtomicU64,
    connections: AtomicU64,
}

impl DeliveryStats {
    pub fn snapshot(&self) -> DeliverySnapshot {
        DeliverySnapshot {
            frames_queued: self.frames_queued.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            frames_discarded: self.frames_discarded.load(Ordering::Relaxed),
            frames_overflowed: self.frames_overflowed.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            frames_failed: self.frames_failed.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
        }
    }

    fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }
}

/// Producer-side handle to a delivery channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DeliveryHandle {
    frames: broadcast::Sender<BinaryFrame>,
    state: watch::Receiver<DeliveryState>,
    stats: Arc<DeliveryStats>,
}

impl DeliveryHandle {
    /// Queue a frame without waiting.
    pub fn send(&self, frame: BinaryFrame) {
        match self.frames.send(frame) {
            Ok(_) => DeliveryStats::add(&self.stats.frames_queued, 1),
            Err(_) => DeliveryStats::add(&self.stats.frames_rejected, 1),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> DeliveryState {
        *self.state.borrow()
    }

    /// Stream of connection states, starting with the current one.
    pub fn state_updates(&self) -> impl Stream<Item = DeliveryState> + 'static {
        WatchStream::new(self.state.clone())
    }

    /// Wait until the state satisfies `predicate`.
    ///
    /// Returns `None` if the delivery task ended first.
    pub async fn wait_for_state(
        &self,
        predicate: impl FnMut(&DeliveryState) -> bool,
    ) -> Option<DeliveryState> {
        let mut state = self.state.clone();
        state.wait_for(predicate).await.ok().map(|current| *current)
    }

    pub fn stats(&self) -> DeliverySnapshot {
        self.stats.snapshot()
    }
}

/// The listening socket plus the single writer that owns it.
pub struct DeliveryChannel {
    listener: TcpListener,
    local_addr: SocketAddr,
    write_timeout: Duration,
    queue: broadcast::Receiver<BinaryFrame>,
    state: watch::Sender<DeliveryState>,
    handle: DeliveryHandle,
}

impl DeliveryChannel {
    /// Bind the listener. The channel starts in [`DeliveryState::Listening`].
    pub async fn bind(config: &DeliveryConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen)
            .await
            .map_err(|e| RelayError::bind_failed(&config.listen, e))?;
        let local_addr =
            listener.local_addr().map_err(|e| RelayError::bind_failed(&config.listen, e))?;

        let (frames, queue) = broadcast::channel(config.queue_capacity.max(1));
        let (state, state_rx) = watch::channel(DeliveryState::Listening);
        let handle =
            DeliveryHandle { frames, state: state_rx, stats: Arc::new(DeliveryStats::default()) };

        info!(addr = %local_addr, schema = SCHEMA_VERSION, "Delivery listener bound");
        Ok(Self { listener, local_addr, write_timeout: config.write_timeout, queue, state, handle })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> DeliveryHandle {
        self.handle.clone()
    }

    /// Run the channel on a new task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Drive the state machine until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(addr = %self.local_addr, "Delivery channel listening");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(e) = self.serve(stream, peer, &cancel).await {
                            DeliveryStats::add(&self.handle.stats.send_failures, 1);
                            warn!("{}, returning to listening", e);
                        }
                        self.state.send_replace(DeliveryState::Listening);
                        info!(addr = %self.local_addr, "Delivery channel listening");
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to accept consumer");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
                received = self.queue.recv() => match received {
                    Ok(frame) => {
                        trace!(tag = frame.tag(), "No consumer, discarding frame");
                        DeliveryStats::add(&self.handle.stats.frames_discarded, 1);
                    }
                    Err(RecvError::Lagged(n)) => {
                        DeliveryStats::add(&self.handle.stats.frames_overflowed, n);
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        info!("Delivery channel stopped");
    }

    /// Stream queued frames to one consumer until the connection is lost.
    ///
    /// Returns `Ok` only on cancellation.
    async fn serve(
        &mut self,
        stream: TcpStream,
        peer: SocketAddr,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(%peer, error = %e, "Failed to set TCP_NODELAY");
        }
        let (mut reader, mut writer) = stream.into_split();
        let stats = Arc::clone(&self.handle.stats);
        DeliveryStats::add(&stats.connections, 1);
        self.state.send_replace(DeliveryState::Connected { peer });
        info!(%peer, "Consumer connected");

        let failed = |reason: String| RelayError::Delivery { peer, reason };
        let mut scratch = [0u8; 256];
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                read = reader.read(&mut scratch) => match read {
                    Ok(0) => return Err(failed("peer closed the connection".into())),
                    Ok(n) => trace!(%peer, bytes = n, "Ignoring consumer input"),
                    Err(e) => return Err(failed(format!("read failed: {}", e))),
                },
                received = self.queue.recv() => match received {
                    Ok(frame) => {
                        match tokio::time::timeout(self.write_timeout, writer.write_all(frame.as_bytes())).await {
                            Ok(Ok(())) => {
                                DeliveryStats::add(&stats.bytes_sent, frame.len() as u64);
                                DeliveryStats::add(&stats.frames_sent, 1);
                            }
                            Ok(Err(e)) => {
                                DeliveryStats::add(&stats.frames_failed, 1);
                                return Err(failed(format!("write failed: {}", e)));
                            }
                            Err(_) => {
                                DeliveryStats::add(&stats.frames_failed, 1);
                                return Err(failed(format!(
                                    "write timed out after {:?}",
                                    self.write_timeout
                                )));
                            }
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(%peer, lost = n, "Consumer fell behind, frames lost");
                        DeliveryStats::add(&stats.frames_overflowed, n);
                    }
                    Err(RecvError::Closed) => return Ok(()),
                },
            }
        }
    }
}
