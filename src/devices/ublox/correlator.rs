//! Command/acknowledgement correlation
//!
//! The configuration protocol is strictly request/response: one command is
//! written, then exactly one ACK-ACK/ACK-NAK is taken from the single-slot
//! channel fed by the reader thread and matched against the command.

use super::constants::{CLASS_ACK, ID_ACK_ACK, ID_ACK_NAK};
use super::packet::Command;
use super::protocol::{Message, UbxPacket};
use crate::error::{ProtocolError, Result};
use crate::transport::Transport;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// ACK-ACK or ACK-NAK from the receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    /// true for ACK-ACK, false for ACK-NAK
    pub accepted: bool,
    pub payload: Vec<u8>,
}

impl Acknowledgement {
    /// Identity of the acknowledged command, from the (class, id) payload
    pub fn acknowledged_identity(&self) -> std::result::Result<&'static str, ProtocolError> {
        let [class, id, ..] = self.payload[..] else {
            return Err(ProtocolError::MalformedAck(format!(
                "payload of {} bytes",
                self.payload.len()
            )));
        };
        super::constants::ubx_message_name(class, id).ok_or_else(|| {
            ProtocolError::MalformedAck(format!("unknown message 0x{:02X}-0x{:02X}", class, id))
        })
    }

    /// Frame as the receiver would send it
    pub fn to_packet(&self) -> UbxPacket {
        let id = if self.accepted { ID_ACK_ACK } else { ID_ACK_NAK };
        UbxPacket::new(CLASS_ACK, id, self.payload.clone())
    }

    /// Acknowledgement for `command`
    pub fn for_command(command: &Command, accepted: bool) -> Self {
        Self {
            accepted,
            payload: vec![command.class(), command.id()],
        }
    }
}

/// Classified inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Acknowledgement(Acknowledgement),
    Data(Message),
}

impl Frame {
    /// Only UBX ACK-ACK / ACK-NAK are acknowledgements; everything else is data
    pub fn classify(message: Message) -> Self {
        match message {
            Message::Ubx(packet)
                if packet.class == CLASS_ACK
                    && (packet.id == ID_ACK_ACK || packet.id == ID_ACK_NAK) =>
            {
                Frame::Acknowledgement(Acknowledgement {
                    accepted: packet.id == ID_ACK_ACK,
                    payload: packet.payload,
                })
            }
            other => Frame::Data(other),
        }
    }
}

/// Single-slot acknowledgement channel between reader loop and correlator
pub fn ack_channel() -> (Sender<Acknowledgement>, Receiver<Acknowledgement>) {
    bounded(1)
}

/// Pairs each outbound command with the next acknowledgement
pub struct Correlator {
    transport: Arc<Mutex<Box<dyn Transport>>>,
    acks: Receiver<Acknowledgement>,
    timeout: Duration,
}

impl Correlator {
    pub fn new(
        transport: Arc<Mutex<Box<dyn Transport>>>,
        acks: Receiver<Acknowledgement>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            acks,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Write `command` and block until its acknowledgement (or timeout).
    ///
    /// Never resends; consumes exactly one acknowledgement when one arrives.
    pub fn send(&self, command: &Command) -> Result<()> {
        let bytes = command.to_bytes();
        log::debug!("Sending {} ({} bytes)", command.identity(), bytes.len());
        self.transport.lock().write_all(&bytes)?;

        let ack = match self.acks.recv_timeout(self.timeout) {
            Ok(ack) => ack,
            Err(RecvTimeoutError::Timeout) => {
                return Err(ProtocolError::Timeout {
                    identity: command.identity(),
                    timeout: self.timeout,
                }
                .into())
            }
            Err(RecvTimeoutError::Disconnected) => return Err(ProtocolError::ChannelClosed.into()),
        };

        check_acknowledgement(command, &ack)?;
        log::info!("{} acknowledged", command.identity());
        Ok(())
    }
}

/// Match an acknowledgement against the command it should answer
pub fn check_acknowledgement(
    command: &Command,
    ack: &Acknowledgement,
) -> std::result::Result<(), ProtocolError> {
    let acknowledged = ack.acknowledged_identity()?;
    if acknowledged != command.identity() {
        return Err(ProtocolError::AckMismatch {
            expected: command.identity(),
            actual: acknowledged.to_string(),
        });
    }
    if !ack.accepted {
        return Err(ProtocolError::Rejected(command.identity()));
    }
    Ok(())
}
