//! RTK base station - u-blox GNSS receiver control and RTCM3 relay
//!
//! This library configures a u-blox receiver as an RTK base station over its
//! command/acknowledgement protocol and relays the RTCM3 corrections it emits
//! to one downstream TCP consumer.
//!
//! - [`devices::ublox`]: frame codec, correlator, reader thread, controller
//! - [`streaming`]: correction queue, TCP relay, NTRIP upload process
//! - [`transport`]: serial port and in-memory mock

pub mod config;
pub mod core;
pub mod devices;
pub mod error;
pub mod streaming;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use crate::core::types::{ControllerState, PositioningMode, Position, RunState};
pub use devices::ublox::ReceiverController;
pub use error::{Error, Result};
