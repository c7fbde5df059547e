//! Delivery channel state machine tests
//!
//! These run real loopback sockets against a spawned channel task.

use super::*;
use crate::test_utils::altimeter_frame;
use futures::StreamExt;
use std::pin::pin;
use tokio::net::TcpSocket;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

struct Running {
    addr: SocketAddr,
    handle: DeliveryHandle,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

async fn bind(queue_capacity: usize) -> DeliveryChannel {
    let config = DeliveryConfig { listen: "127.0.0.1:0".into(), queue_capacity, ..Default::default() };
    DeliveryChannel::bind(&config).await.expect("bind loopback")
}

async fn bind_with_timeout(write_timeout: Duration) -> DeliveryChannel {
    let config = DeliveryConfig {
        listen: "127.0.0.1:0".into(),
        queue_capacity: 4096,
        write_timeout,
    };
    DeliveryChannel::bind(&config).await.expect("bind loopback")
}

fn spawn(channel: DeliveryChannel) -> Running {
    let addr = channel.local_addr();
    let handle = channel.handle();
    let cancel = CancellationToken::new();
    let task = channel.spawn(cancel.clone());
    Running { addr, handle, cancel, task }
}

async fn connect(running: &Running) -> TcpStream {
    let stream = TcpStream::connect(running.addr).await.expect("connect");
    let local = stream.local_addr().expect("client addr");
    timeout(WAIT, running.handle.wait_for_state(|s| *s == DeliveryState::Connected { peer: local }))
        .await
        .expect("consumer accepted")
        .expect("channel running");
    stream
}

/// Wait until the channel is listening again with every queued frame
/// accounted for, so the next consumer starts from an empty queue.
async fn settled_after_failure(handle: &DeliveryHandle) {
    timeout(WAIT, handle.wait_for_state(|s| *s == DeliveryState::Listening))
        .await
        .expect("failure detected")
        .expect("channel running");
    eventually(|| {
        let stats = handle.stats();
        stats.frames_queued
            == stats.frames_sent
                + stats.frames_discarded
                + stats.frames_overflowed
                + stats.frames_failed
    })
    .await;
}

async fn eventually(mut check: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn read_frames(stream: &mut TcpStream, frames: &[BinaryFrame]) {
    let expected: Vec<u8> = frames.iter().flat_map(|f| f.as_bytes().to_vec()).collect();
    let mut received = vec![0u8; expected.len()];
    timeout(WAIT, stream.read_exact(&mut received)).await.expect("frames arrive").expect("read");
    assert_eq!(received, expected);
}

#[tokio::test]
async fn frames_arrive_in_production_order() {
    let running = spawn(bind(DEFAULT_QUEUE_CAPACITY).await);
    let mut client = connect(&running).await;

    let frames: Vec<_> = (0..5).map(altimeter_frame).collect();
    for frame in &frames {
        running.handle.send(frame.clone());
    }
    read_frames(&mut client, &frames).await;

    let handle = running.handle.clone();
    eventually(|| handle.stats().frames_sent == 5).await;
    assert_eq!(handle.stats().bytes_sent, 5 * 56);
    running.cancel.cancel();
}

#[tokio::test]
async fn frames_without_consumer_are_discarded() {
    let running = spawn(bind(DEFAULT_QUEUE_CAPACITY).await);
    for count in 0..3 {
        running.handle.send(altimeter_frame(count));
    }

    let handle = running.handle.clone();
    eventually(|| handle.stats().frames_discarded == 3).await;
    assert_eq!(handle.state(), DeliveryState::Listening);
    assert_eq!(handle.stats().frames_sent, 0);

    // A late consumer only sees frames produced after it connected.
    let mut client = connect(&running).await;
    let fresh = altimeter_frame(99);
    running.handle.send(fresh.clone());
    read_frames(&mut client, &[fresh]).await;
    running.cancel.cancel();
}

#[tokio::test]
async fn hangup_returns_to_listening_and_accepts_again() {
    let running = spawn(bind(DEFAULT_QUEUE_CAPACITY).await);

    let mut first = connect(&running).await;
    let frame = altimeter_frame(1);
    running.handle.send(frame.clone());
    read_frames(&mut first, &[frame]).await;
    drop(first);

    timeout(WAIT, running.handle.wait_for_state(|s| *s == DeliveryState::Listening))
        .await
        .expect("hangup detected")
        .expect("channel running");
    assert_eq!(running.handle.stats().send_failures, 1);

    let mut second = connect(&running).await;
    let frames = [altimeter_frame(2), altimeter_frame(3)];
    for frame in &frames {
        running.handle.send(frame.clone());
    }
    read_frames(&mut second, &frames).await;
    assert_eq!(running.handle.stats().connections, 2);
    running.cancel.cancel();
}

#[tokio::test]
async fn stalled_consumer_hits_write_timeout() {
    let running = spawn(bind_with_timeout(Duration::from_millis(50)).await);

    let socket = TcpSocket::new_v4().expect("socket");
    socket.set_recv_buffer_size(4096).expect("recv buffer");
    let stalled = socket.connect(running.addr).await.expect("connect");
    let local = stalled.local_addr().expect("client addr");
    timeout(WAIT, running.handle.wait_for_state(|s| *s == DeliveryState::Connected { peer: local }))
        .await
        .expect("consumer accepted")
        .expect("channel running");

    // Never read: once the socket buffers fill, a write blocks past the timeout.
    let frame = altimeter_frame(1);
    timeout(Duration::from_secs(30), async {
        while running.handle.stats().send_failures == 0 {
            for _ in 0..512 {
                running.handle.send(frame.clone());
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("write timeout detected");
    settled_after_failure(&running.handle).await;
    let stats = running.handle.stats();
    assert_eq!(stats.send_failures, 1);
    assert_eq!(stats.frames_failed, 1);
    assert!(stats.frames_sent > 0);

    let mut fresh = connect(&running).await;
    let frames = [altimeter_frame(2), altimeter_frame(3)];
    for frame in &frames {
        running.handle.send(frame.clone());
    }
    read_frames(&mut fresh, &frames).await;
    assert_eq!(running.handle.stats().connections, 2);
    drop(stalled);
    running.cancel.cancel();
}

#[tokio::test]
async fn reset_mid_stream_is_a_send_failure() {
    let running = spawn(bind(DEFAULT_QUEUE_CAPACITY).await);

    let mut first = connect(&running).await;
    let frame = altimeter_frame(1);
    running.handle.send(frame.clone());
    read_frames(&mut first, &[frame]).await;

    // Zero linger: dropping sends RST instead of FIN.
    #[allow(deprecated)]
    let linger = first.set_linger(Some(Duration::ZERO));
    linger.expect("linger");
    drop(first);
    let handle = running.handle.clone();
    timeout(WAIT, async {
        while handle.stats().send_failures == 0 {
            handle.send(altimeter_frame(2));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("reset detected");
    settled_after_failure(&handle).await;
    assert_eq!(handle.stats().send_failures, 1);

    let mut second = connect(&running).await;
    let frames = [altimeter_frame(3), altimeter_frame(4)];
    for frame in &frames {
        running.handle.send(frame.clone());
    }
    read_frames(&mut second, &frames).await;
    assert_eq!(handle.stats().connections, 2);
    running.cancel.cancel();
}

#[tokio::test]
async fn overflow_drops_oldest_frames() {
    let channel = bind(4).await;
    let handle = channel.handle();
    for count in 0..10 {
        handle.send(altimeter_frame(count));
    }
    assert_eq!(handle.stats().frames_queued, 10);

    let running = spawn(channel);
    let handle = running.handle.clone();
    eventually(|| {
        let stats = handle.stats();
        stats.frames_overflowed == 6 && stats.frames_discarded == 4
    })
    .await;
    running.cancel.cancel();
}

#[tokio::test]
async fn state_updates_follow_connections() {
    let running = spawn(bind(DEFAULT_QUEUE_CAPACITY).await);
    let mut updates = pin!(running.handle.state_updates());
    assert_eq!(updates.next().await, Some(DeliveryState::Listening));

    let client = connect(&running).await;
    let next = timeout(WAIT, updates.next()).await.expect("state update");
    assert!(next.is_some_and(|s| s.is_connected()));

    drop(client);
    let next = timeout(WAIT, updates.next()).await.expect("state update");
    assert_eq!(next, Some(DeliveryState::Listening));
    running.cancel.cancel();
}

#[tokio::test]
async fn cancellation_stops_the_task() {
    let running = spawn(bind(DEFAULT_QUEUE_CAPACITY).await);
    let mut client = connect(&running).await;

    running.cancel.cancel();
    timeout(WAIT, running.task).await.expect("task stops").expect("task did not panic");

    let mut buf = [0u8; 8];
    let read = timeout(WAIT, client.read(&mut buf)).await.expect("socket closed");
    assert!(matches!(read, Ok(0) | Err(_)));

    running.handle.send(altimeter_frame(7));
    assert_eq!(running.handle.stats().frames_rejected, 1);
}

#[tokio::test]
async fn bind_failure_is_reported() {
    let first = bind(DEFAULT_QUEUE_CAPACITY).await;
    let config = DeliveryConfig { listen: first.local_addr().to_string(), ..Default::default() };
    match DeliveryChannel::bind(&config).await {
        Err(RelayError::Bind { addr, .. }) => assert_eq!(addr, config.listen),
        Err(other) => panic!("expected bind error, got {:?}", other),
        Ok(_) => panic!("second bind on the same port succeeded"),
    }
}
