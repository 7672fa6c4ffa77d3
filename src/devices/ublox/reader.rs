//! Reader thread for the u-blox receiver
//!
//! Polls the transport for available bytes, splits them into frames and
//! routes each one:
//!
//! - **ACK-ACK / ACK-NAK**: handed to the correlator over the single-slot channel
//! - **Everything else**: passed to the [`MessageSink`] in arrival order
//!
//! A frame that fails to decode is logged and dropped; the loop keeps going.
//! The stop flag is checked at least every [`ACK_HANDOFF_RETRY_MS`], so
//! shutdown latency stays well under a second with or without traffic.

use super::constants::{ACK_HANDOFF_RETRY_MS, READER_POLL_INTERVAL_MS};
use super::correlator::{Acknowledgement, Frame};
use super::protocol::FrameReader;
use crate::core::sink::MessageSink;
use crate::core::types::RunState;
use crate::transport::Transport;
use crossbeam_channel::{SendTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Upper bound for one read while holding the transport lock
const READ_CHUNK: usize = 1024;

/// Counters reported when the loop exits
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReaderStats {
    pub acknowledgements: u64,
    pub messages: u64,
    pub decode_errors: u64,
    pub read_errors: u64,
}

/// Reader loop - runs until `run_state` leaves `Running`
pub(crate) fn reader_loop(
    transport: Arc<Mutex<Box<dyn Transport>>>,
    run_state: Arc<RunState>,
    acks: Sender<Acknowledgement>,
    mut sink: Box<dyn MessageSink>,
) -> ReaderStats {
    let mut frames = FrameReader::new();
    let mut stats = ReaderStats::default();
    let mut chunk = [0u8; READ_CHUNK];
    let poll_interval = Duration::from_millis(READER_POLL_INTERVAL_MS);

    while run_state.is_running() {
        // Only read what is already there so the lock is never held across a read timeout
        let read_result = {
            let mut port = transport.lock();
            match port.available() {
                Ok(0) => Ok(0),
                Ok(n) => port.read(&mut chunk[..n.min(READ_CHUNK)]),
                Err(e) => Err(e),
            }
        };

        match read_result {
            Ok(0) => {
                thread::sleep(poll_interval);
                continue;
            }
            Ok(n) => frames.extend(&chunk[..n]),
            Err(e) => {
                stats.read_errors += 1;
                log::error!("Transport read error: {}", e);
                thread::sleep(poll_interval);
                continue;
            }
        }

        while let Some(result) = frames.next_frame() {
            match result {
                Ok(message) => match Frame::classify(message) {
                    Frame::Acknowledgement(ack) => {
                        stats.acknowledgements += 1;
                        log::debug!(
                            "{} received for {:02X?}",
                            if ack.accepted { "ACK-ACK" } else { "ACK-NAK" },
                            ack.payload
                        );
                        if !hand_off_ack(&acks, ack, &run_state) {
                            break;
                        }
                    }
                    Frame::Data(message) => {
                        stats.messages += 1;
                        sink.on_message(message);
                    }
                },
                Err(e) => {
                    stats.decode_errors += 1;
                    log::debug!("Dropping undecodable frame: {}", e);
                }
            }
        }
    }

    log::info!(
        "Reader thread exiting ({} acks, {} messages, {} decode errors)",
        stats.acknowledgements,
        stats.messages,
        stats.decode_errors
    );
    stats
}

/// Push an acknowledgement into the single slot, re-checking the stop flag
/// while the slot is occupied. Returns false if the loop should stop.
fn hand_off_ack(acks: &Sender<Acknowledgement>, ack: Acknowledgement, run_state: &RunState) -> bool {
    let retry = Duration::from_millis(ACK_HANDOFF_RETRY_MS);
    let mut pending = ack;
    loop {
        match acks.send_timeout(pending, retry) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(ack)) => {
                if !run_state.is_running() {
                    return false;
                }
                log::warn!("Acknowledgement slot still occupied, waiting for correlator");
                pending = ack;
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                log::warn!("Acknowledgement channel closed, dropping acknowledgement");
                return true;
            }
        }
    }
}
