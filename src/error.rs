//! Error types for the RTK base station

use std::time::Duration;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Command/acknowledgement protocol failures
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Acknowledgement refers to a different command than the one sent
    #[error("Acknowledgement mismatch: sent {expected}, acknowledged {actual}")]
    AckMismatch {
        expected: &'static str,
        actual: String,
    },

    /// No command identity could be extracted from the acknowledgement
    #[error("Malformed acknowledgement: {0}")]
    MalformedAck(String),

    /// Device answered ACK-NAK for the command
    #[error("Command {0} rejected by receiver (ACK-NAK)")]
    Rejected(&'static str),

    /// No acknowledgement arrived in time
    #[error("No acknowledgement for {identity} within {timeout:?}")]
    Timeout {
        identity: &'static str,
        timeout: Duration,
    },

    /// Reader loop went away while waiting
    #[error("Acknowledgement channel closed")]
    ChannelClosed,
}

/// Correction relay session failures
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Nobody connected within the accept window
    #[error("No consumer connected within {0:?}")]
    AcceptTimeout(Duration),

    /// Write to the consumer failed (peer closed)
    #[error("Consumer disconnected: {0}")]
    ConsumerDisconnected(std::io::Error),

    /// Stop requested before a consumer connected
    #[error("Relay stopped before a consumer connected")]
    Stopped,

    /// Listener failure
    #[error("Relay I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Positioning encoder input errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodingError {
    #[error("Cannot encode non-finite value {0}")]
    NonFinite(f64),

    #[error("Scaled value {0} does not fit the device integer range")]
    OutOfRange(f64),
}

/// Frame decoding failures (one bad frame, never fatal to the reader)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("UBX checksum mismatch for {class:#04x}-{id:#04x}")]
    UbxChecksum { class: u8, id: u8 },

    #[error("UBX payload length {0} exceeds limit")]
    UbxOversized(usize),

    #[error("RTCM3 CRC mismatch: expected {expected:#08x}, got {actual:#08x}")]
    RtcmCrc { expected: u32, actual: u32 },

    #[error("Invalid NMEA sentence: {0}")]
    InvalidNmea(String),
}

/// RTK base station error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No serial peripheral carries the u-blox signature
    #[error("No u-blox GNSS receiver found")]
    NoDeviceFound,

    /// Several receivers present and none selected explicitly
    #[error("Multiple u-blox GNSS receivers found ({0:?}); select one by port or serial number")]
    AmbiguousDevice(Vec<String>),

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport read/write failure
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Configuration key not present in the key table
    #[error("Unknown configuration key: {0}")]
    UnknownConfigKey(String),

    /// Value does not fit the key's storage type
    #[error("Value {value} out of range for configuration key {key}")]
    ConfigValueOutOfRange { key: String, value: i64 },

    /// Operation not allowed in the current controller state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Publisher subprocess could not be launched
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// Signal handler installation failed
    #[error("Signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),

    /// Worker thread panicked
    #[error("Thread panicked")]
    ThreadPanic,
}
