//! Mock transport for testing without a receiver attached

use super::Transport;
use crate::devices::ublox::{Acknowledgement, FrameReader, Message, CLASS_ACK};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// How the mock answers UBX commands written to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    /// Never answer
    Silent,
    /// Answer every command with ACK-ACK
    Accept,
    /// Answer every command with ACK-NAK
    Reject,
}

/// In-memory duplex transport
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

struct MockTransportInner {
    read_buffer: VecDeque<u8>,
    write_buffer: Vec<u8>,
    /// Splits written bytes into commands for auto-acknowledgement
    command_reader: FrameReader,
    ack_mode: AckMode,
    /// One-shot replies, each injected after the next written command
    scripted_replies: VecDeque<Vec<u8>>,
    fail_writes: bool,
}

impl MockTransport {
    /// Create a new mock transport that never answers
    pub fn new() -> Self {
        Self::with_ack_mode(AckMode::Silent)
    }

    /// Create a mock that acknowledges every written command
    pub fn with_auto_ack() -> Self {
        Self::with_ack_mode(AckMode::Accept)
    }

    pub fn with_ack_mode(ack_mode: AckMode) -> Self {
        MockTransport {
            inner: Arc::new(Mutex::new(MockTransportInner {
                read_buffer: VecDeque::new(),
                write_buffer: Vec::new(),
                command_reader: FrameReader::new(),
                ack_mode,
                scripted_replies: VecDeque::new(),
                fail_writes: false,
            })),
        }
    }

    /// Inject data to be read
    pub fn inject_read(&self, data: &[u8]) {
        self.inner.lock().read_buffer.extend(data);
    }

    /// Queue a reply sent in place of the automatic one for the next command
    pub fn push_reply(&self, reply: Vec<u8>) {
        self.inner.lock().scripted_replies.push_back(reply);
    }

    pub fn set_ack_mode(&self, ack_mode: AckMode) {
        self.inner.lock().ack_mode = ack_mode;
    }

    /// Make every subsequent write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Get all written data
    pub fn get_written(&self) -> Vec<u8> {
        self.inner.lock().write_buffer.clone()
    }

    /// Clear written data
    pub fn clear_written(&self) {
        self.inner.lock().write_buffer.clear();
    }

    /// Bytes still waiting to be read
    pub fn pending_read(&self) -> usize {
        self.inner.lock().read_buffer.len()
    }
}

impl MockTransportInner {
    fn answer_commands(&mut self) {
        while let Some(frame) = self.command_reader.next_frame() {
            let Ok(Message::Ubx(packet)) = frame else {
                continue;
            };
            if packet.class == CLASS_ACK {
                continue;
            }

            if let Some(reply) = self.scripted_replies.pop_front() {
                self.read_buffer.extend(reply);
                continue;
            }

            let accepted = match self.ack_mode {
                AckMode::Silent => continue,
                AckMode::Accept => true,
                AckMode::Reject => false,
            };
            let ack = Acknowledgement {
                accepted,
                payload: vec![packet.class, packet.id],
            };
            self.read_buffer.extend(ack.to_packet().to_bytes());
        }
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let available = inner.read_buffer.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(inner.read_buffer.drain(..available)) {
            *slot = byte;
        }
        Ok(available)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(Error::Transport("mock write failure".to_string()));
        }
        inner.write_buffer.extend_from_slice(data);
        inner.command_reader.extend(data);
        inner.answer_commands();
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.inner.lock().read_buffer.len())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}
