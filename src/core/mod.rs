//! Core abstractions shared by the receiver driver and the relay.
//!
//! - [`types`]: positions, configuration items, lifecycle flags
//! - [`encoding`]: fixed-point/high-precision coordinate encoding
//! - [`sink`]: [`sink::MessageSink`] trait for non-acknowledgement frames

pub mod encoding;
pub mod sink;
pub mod types;
