//! Correction block queue between the reader thread and the relay.
//!
//! The producer side never blocks: the queue is unbounded and the relay
//! discards whatever accumulated before its consumer connected. Once the
//! relay session ends the queue is closed and further blocks are dropped.

use crate::core::sink::MessageSink;
use crate::devices::ublox::Message;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// FIFO of raw RTCM3 frames awaiting relay
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct CorrectionQueue {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    /// Set when the consumer side is gone for good
    closed: Arc<AtomicBool>,
}

impl CorrectionQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Append one correction block; dropped once the queue is closed
    pub fn push(&self, block: Vec<u8>) {
        if self.is_closed() {
            return;
        }
        // Both halves live in every handle, so the channel never disconnects
        let _ = self.tx.send(block);
    }

    /// Oldest block, waiting at most `timeout`
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Vec<u8>> {
        match self.rx.recv_timeout(timeout) {
            Ok(block) => Some(block),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Discard every queued block; returns how many were dropped
    pub fn flush(&self) -> usize {
        self.rx.try_iter().count()
    }

    /// Stop accepting blocks and discard the ones still queued.
    /// Returns how many were dropped.
    pub fn close(&self) -> usize {
        self.closed.store(true, Ordering::Release);
        self.flush()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for CorrectionQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Sink adapter feeding RTCM3 frames to the relay queue
///
/// Every message, RTCM3 included, is still forwarded to the inner sink.
pub struct CorrectionTap<S: MessageSink> {
    queue: CorrectionQueue,
    inner: S,
}

impl<S: MessageSink> CorrectionTap<S> {
    pub fn new(queue: CorrectionQueue, inner: S) -> Self {
        Self { queue, inner }
    }
}

impl<S: MessageSink> MessageSink for CorrectionTap<S> {
    fn on_message(&mut self, message: Message) {
        if let Message::Rtcm(frame) = &message {
            self.queue.push(frame.bytes.clone());
        }
        self.inner.on_message(message);
    }
}
