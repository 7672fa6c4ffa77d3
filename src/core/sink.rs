//! Message sinks for frames the reader loop does not consume itself

use crate::devices::ublox::Message;

/// Receives every decoded frame that is not a command acknowledgement,
/// in arrival order, on the reader thread.
pub trait MessageSink: Send {
    fn on_message(&mut self, message: Message);
}

impl<F> MessageSink for F
where
    F: FnMut(Message) + Send,
{
    fn on_message(&mut self, message: Message) {
        self(message)
    }
}

/// Default sink: logs each message at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn on_message(&mut self, message: Message) {
        match &message {
            Message::Ubx(packet) => log::debug!(
                "UBX {} ({} bytes)",
                packet.identity(),
                packet.payload.len()
            ),
            Message::Nmea(sentence) => log::debug!("NMEA {}", sentence),
            Message::Rtcm(frame) => log::debug!(
                "RTCM3 {} ({} bytes)",
                frame.message_type,
                frame.bytes.len()
            ),
        }
    }
}
