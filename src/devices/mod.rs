//! Device drivers

pub mod ublox;
