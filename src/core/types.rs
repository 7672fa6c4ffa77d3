//! Shared data types: positions, configuration items, lifecycle flags.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

/// Geodetic position of the base antenna
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Position {
    pub latitude_degrees: f64,
    pub longitude_degrees: f64,
    pub altitude_meters: f64,
}

impl Position {
    pub const fn new(latitude_degrees: f64, longitude_degrees: f64, altitude_meters: f64) -> Self {
        Self {
            latitude_degrees,
            longitude_degrees,
            altitude_meters,
        }
    }

    /// Known surveyed point used for bench testing fixed mode
    pub const fn test_position() -> Self {
        Self::new(48.6467596667, 16.791555, 215.3)
    }

    pub fn is_finite(&self) -> bool {
        self.latitude_degrees.is_finite()
            && self.longitude_degrees.is_finite()
            && self.altitude_meters.is_finite()
    }
}

/// One `(key, value)` pair of a CFG-VALSET payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigItem {
    pub key: String,
    pub value: i64,
}

impl ConfigItem {
    pub fn new(key: impl Into<String>, value: i64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Positioning mode selected for a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositioningMode {
    /// Receiver averages its own position until the targets are met
    SurveyIn {
        accuracy_limit_mm: u32,
        min_duration: Duration,
    },
    /// Operator supplies the antenna position
    Fixed {
        position: Position,
        accuracy_limit_mm: u32,
    },
}

/// Receiver controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Disconnected,
    Connected,
    FactoryReset,
    Rtcm3Configured,
    SurveyIn,
    Fixed,
    Running,
    Stopped,
}

const NOT_STARTED: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Observed lifecycle phase of a [`RunState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    NotStarted,
    Running,
    Stopped,
}

/// Session stop flag shared by the reader loop, the relay and the signal handler.
///
/// Transitions only go forward: `NotStarted -> Running -> Stopped`
/// (a session that never started may go straight to `Stopped`).
#[derive(Debug, Default)]
pub struct RunState {
    phase: AtomicU8,
}

impl RunState {
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(NOT_STARTED),
        }
    }

    /// Move `NotStarted -> Running`. Returns false if already started or stopped.
    pub fn start(&self) -> bool {
        self.phase
            .compare_exchange(NOT_STARTED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Request stop. Returns true if this call performed the transition.
    pub fn stop(&self) -> bool {
        self.phase.swap(STOPPED, Ordering::AcqRel) != STOPPED
    }

    pub fn phase(&self) -> RunPhase {
        match self.phase.load(Ordering::Acquire) {
            NOT_STARTED => RunPhase::NotStarted,
            RUNNING => RunPhase::Running,
            _ => RunPhase::Stopped,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.phase.load(Ordering::Acquire) == RUNNING
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.phase.load(Ordering::Acquire) == STOPPED
    }
}
