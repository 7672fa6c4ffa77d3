//! Correction data streaming
//!
//! - [`queue`]: correction block queue and the tap that fills it
//! - [`relay`]: single-consumer TCP relay
//! - [`ntrip`]: external NTRIP upload process

pub mod ntrip;
pub mod queue;
pub mod relay;

pub use ntrip::NtripPublisher;
pub use queue::{CorrectionQueue, CorrectionTap};
pub use relay::{CorrectionRelay, RelayStats};
