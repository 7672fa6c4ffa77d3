//! Integration tests for the correction relay over loopback TCP.

use rtk_base::error::RelayError;
use rtk_base::streaming::{CorrectionQueue, CorrectionRelay, RelayStats};
use rtk_base::RunState;
use std::io::Read;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

type RelayHandle = JoinHandle<Result<RelayStats, RelayError>>;

fn start_relay() -> (CorrectionQueue, Arc<RunState>, std::net::SocketAddr, RelayHandle) {
    let queue = CorrectionQueue::new();
    let run_state = Arc::new(RunState::new());
    let relay = CorrectionRelay::bind(
        "127.0.0.1:0",
        queue.clone(),
        Arc::clone(&run_state),
        Duration::from_secs(5),
    )
    .unwrap();
    let addr = relay.local_addr().unwrap();
    let handle = relay.spawn().unwrap();
    (queue, run_state, addr, handle)
}

fn wait_for(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Connect and wait until the relay has dropped the `stale` backlog
fn connect_after_backlog(queue: &CorrectionQueue, addr: std::net::SocketAddr) -> TcpStream {
    queue.push(b"stale-1".to_vec());
    queue.push(b"stale-2".to_vec());

    let consumer = TcpStream::connect(addr).unwrap();
    consumer
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    assert!(wait_for(Duration::from_secs(2), || queue.is_empty()));
    consumer
}

#[test]
fn test_backlog_discarded_and_fifo_delivery() {
    let (queue, run_state, addr, handle) = start_relay();
    let mut consumer = connect_after_backlog(&queue, addr);

    queue.push(b"abc".to_vec());
    queue.push(b"defg".to_vec());
    queue.push(vec![0xD3, 0x00, 0x00]);

    let mut received = [0u8; 10];
    consumer.read_exact(&mut received).unwrap();
    assert_eq!(&received, b"abcdefg\xD3\x00\x00");

    run_state.stop();
    let stats = handle.join().unwrap().unwrap();
    assert_eq!(stats.discarded, 2);
    assert_eq!(stats.blocks_sent, 3);
    assert_eq!(stats.bytes_sent, 10);
    assert_eq!(stats.consumer, consumer.local_addr().unwrap());
}

#[test]
fn test_stop_ends_idle_session() {
    let (queue, run_state, addr, handle) = start_relay();
    let _consumer = connect_after_backlog(&queue, addr);

    let start = Instant::now();
    run_state.stop();
    let stats = handle.join().unwrap().unwrap();
    assert!(start.elapsed() < Duration::from_millis(500));
    assert_eq!(stats.blocks_sent, 0);
}

#[test]
fn test_consumer_disconnect_ends_session() {
    let (queue, _run_state, addr, handle) = start_relay();
    let consumer = connect_after_backlog(&queue, addr);
    drop(consumer);

    // The first writes may still land in the socket buffer before the reset
    let finished = wait_for(Duration::from_secs(5), || {
        queue.push(vec![0x55; 1024]);
        handle.is_finished()
    });
    assert!(finished);

    match handle.join().unwrap() {
        Err(RelayError::ConsumerDisconnected(_)) => {}
        other => panic!("expected ConsumerDisconnected, got {:?}", other),
    }
}

#[test]
fn test_second_consumer_not_served() {
    let (queue, run_state, addr, handle) = start_relay();
    let mut first = connect_after_backlog(&queue, addr);

    // Accepted by the OS backlog, but never read from by the relay
    let mut second = TcpStream::connect(addr).unwrap();
    second
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();

    queue.push(b"only-first".to_vec());
    let mut buf = [0u8; 10];
    first.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"only-first");

    let mut other = [0u8; 1];
    assert!(second.read(&mut other).is_err());

    run_state.stop();
    handle.join().unwrap().unwrap();
}

#[test]
fn test_stop_with_stalled_consumer() {
    let (queue, run_state, addr, handle) = start_relay();
    // Connected, but never reads: the socket buffers fill and writes stall
    let _consumer = connect_after_backlog(&queue, addr);

    for _ in 0..2000 {
        queue.push(vec![0xA5; 4096]);
    }
    thread::sleep(Duration::from_millis(300));
    assert!(!handle.is_finished());

    // Bounded by one write timeout plus one queue poll
    run_state.stop();
    assert!(wait_for(Duration::from_secs(1), || handle.is_finished()));

    let stats = handle.join().unwrap().unwrap();
    assert!(stats.blocks_sent < 2000);
}

#[test]
fn test_queue_closed_when_session_ends() {
    let (queue, _run_state, addr, handle) = start_relay();
    let consumer = connect_after_backlog(&queue, addr);
    drop(consumer);

    assert!(wait_for(Duration::from_secs(5), || {
        queue.push(vec![0x55; 1024]);
        handle.is_finished()
    }));
    assert!(handle.join().unwrap().is_err());

    for _ in 0..10_000 {
        queue.push(vec![0xD3; 64]);
    }
    assert!(queue.is_closed());
    assert_eq!(queue.len(), 0);
}
