//! Integration tests: raw lines in, binary frames out over TCP

use std::time::Duration;

use anyhow::{Context, Result};
use downlink::schema::peek_frame_len;
use downlink::{DeliveryState, FeedId, LineSource, RawLine, Relay, RelayConfig};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

const ALTIMETER_A: &str = "R:2864:-13:-75:7698:3:0:0:-70:5:8";
const RX_NOMTK: &str = "@ RX_NOMTK 202 0000 00 00 03:00:59.920 CRC_OK  Rx NomTrk FthrWt04072 PkRx 10636 PkTx 10959 RSSI -077 SNR +06 AckRx 10598 AckTx 10645 RSSI -085 SNR  +6 SF 10 frq 919000000 trk_B_V 3972   +0 C CRC: 5D9B";
const GPS_STAT: &str = "@ GPS_STAT 202 0000 00 00 03:00:59.920 CRC_OK TRK FthrWt04072 Alt 000114 lt +37.123456 ln -122.123450 Vel +0000 +069 +0000 Fix 3 # 21 14 10 5 000_00_00 000_00_00 000_00_00 000_00_00 000_00_00 CRC: 7C9A";
const COMPOUND: &str = "R:2864:-13:-75:7698:3:0:0:T:153012:1523:-12:84:CCO:4:-70:5:8";

/// Feed whose lines are pushed by the test.
struct ScriptedFeed {
    feed: FeedId,
    lines: mpsc::UnboundedReceiver<Vec<u8>>,
    seq: u64,
}

fn scripted_feed(name: &str) -> (mpsc::UnboundedSender<Vec<u8>>, ScriptedFeed) {
    let (tx, lines) = mpsc::unbounded_channel();
    (tx, ScriptedFeed { feed: FeedId::from(name), lines, seq: 0 })
}

#[async_trait::async_trait]
impl LineSource for ScriptedFeed {
    async fn next_line(&mut self) -> downlink::Result<Option<RawLine>> {
        let Some(bytes) = self.lines.recv().await else {
            return Ok(None);
        };
        self.seq += 1;
        Ok(Some(RawLine::new(self.feed.clone(), self.seq - 1, bytes)))
    }

    fn feed(&self) -> &FeedId {
        &self.feed
    }
}

fn listen_anywhere() -> RelayConfig {
    RelayConfig { listen: "127.0.0.1:0".into(), ..Default::default() }
}

async fn read_bytes(consumer: &mut TcpStream, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    tokio::time::timeout(Duration::from_secs(5), consumer.read_exact(&mut buf))
        .await
        .context("consumer read timed out")??;
    Ok(buf)
}

/// Split a byte stream into frames the way the consumer does.
fn split_frames(mut bytes: &[u8]) -> Vec<&[u8]> {
    let mut frames = Vec::new();
    while let Some(len) = peek_frame_len(bytes) {
        frames.push(&bytes[..len]);
        bytes = &bytes[len..];
    }
    assert!(bytes.is_empty(), "trailing bytes after last frame");
    frames
}

fn tag(frame: &[u8]) -> i32 {
    i32::from_le_bytes(frame[..4].try_into().unwrap())
}

#[tokio::test]
async fn noisy_feed_is_relayed_and_archived() -> Result<()> {
    let archive = tempfile::tempdir()?;
    let config =
        RelayConfig { archive_dir: Some(archive.path().to_path_buf()), ..listen_anywhere() };
    let (lines, feed) = scripted_feed("raven");
    let mut relay = Relay::with_sources(&config, [feed]).await?;

    let mut consumer = TcpStream::connect(relay.local_addr()).await?;
    relay.delivery().wait_for_state(DeliveryState::is_connected).await.context("relay stopped")?;

    let input: Vec<Vec<u8>> = vec![
        ALTIMETER_A.into(),
        // pg corrupted in flight
        b"R:2865:-13:-7S:7698:3:0:0:-70:5:8".to_vec(),
        b"\x00\xff\x13".to_vec(),
        COMPOUND.into(),
        // addressed to another tracker
        GPS_STAT.replace("FthrWt04072", "FthrWt09999").into_bytes(),
        RX_NOMTK.into(),
        b"R:2866:-13:-75:7698:3:0:0:-70:5:8".to_vec(),
    ];
    for line in &input {
        lines.send(line.clone())?;
    }
    drop(lines);

    let summaries = relay.feeds_finished().await;
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].lines, 7);
    assert_eq!(summaries[0].frames, 5);

    let bytes = read_bytes(&mut consumer, 56 + 56 + 48 + 64 + 56).await?;
    let frames = split_frames(&bytes);
    assert_eq!(frames.iter().map(|f| tag(f)).collect::<Vec<_>>(), vec![14, 14, 15, 13, 14]);

    let sample = |frame: &[u8]| u32::from_le_bytes(frame[12..16].try_into().unwrap());
    assert_eq!(sample(frames[0]), 2864);
    assert_eq!(sample(frames[4]), 2866);

    let stats = relay.stats();
    assert_eq!(stats.pipeline.lines, 7);
    assert_eq!(stats.pipeline.frames, 5);
    assert_eq!(stats.pipeline.numeric_corruption, 1);
    assert_eq!(stats.pipeline.not_addressed, 1);
    assert_eq!(stats.delivery.frames_queued, 5);

    relay.shutdown().await;

    let archived = std::fs::read(archive.path().join("raven.log"))?;
    let records: Vec<&[u8]> = archived.split(|b| *b == b'\n').filter(|r| !r.is_empty()).collect();
    assert_eq!(records.len(), input.len());
    for (record, line) in records.iter().zip(&input) {
        assert!(record.ends_with(line));
    }
    Ok(())
}

#[tokio::test]
async fn consumer_can_reconnect() -> Result<()> {
    let (lines, feed) = scripted_feed("tracker");
    let relay = Relay::with_sources(&listen_anywhere(), [feed]).await?;
    let handle = relay.delivery().clone();

    let first = TcpStream::connect(relay.local_addr()).await?;
    handle.wait_for_state(DeliveryState::is_connected).await.context("relay stopped")?;
    drop(first);
    handle.wait_for_state(|state| !state.is_connected()).await.context("relay stopped")?;

    let mut second = TcpStream::connect(relay.local_addr()).await?;
    handle.wait_for_state(DeliveryState::is_connected).await.context("relay stopped")?;
    lines.send(GPS_STAT.into())?;

    let bytes = read_bytes(&mut second, 64).await?;
    assert_eq!(tag(&bytes), 12);

    let stats = relay.stats().delivery;
    assert_eq!(stats.connections, 2);
    assert_eq!(stats.send_failures, 1);
    relay.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn frames_without_consumer_are_dropped() -> Result<()> {
    let (lines, feed) = scripted_feed("raven");
    let mut relay = Relay::with_sources(&listen_anywhere(), [feed]).await?;
    assert_eq!(relay.state(), DeliveryState::Listening);

    for _ in 0..3 {
        lines.send(ALTIMETER_A.into())?;
    }
    drop(lines);
    relay.feeds_finished().await;

    let discarded = async {
        while relay.stats().delivery.frames_discarded < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), discarded).await?;
    assert_eq!(relay.stats().delivery.frames_sent, 0);
    Ok(())
}

#[tokio::test]
async fn bind_conflict_is_reported() -> Result<()> {
    let relay = Relay::with_sources(&listen_anywhere(), Vec::<ScriptedFeed>::new()).await?;
    let taken = RelayConfig { listen: relay.local_addr().to_string(), ..Default::default() };
    let result = Relay::start(taken).await;
    assert!(matches!(result, Err(downlink::RelayError::Bind { .. })));
    Ok(())
}
