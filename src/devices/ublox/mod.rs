//! u-blox GNSS receiver driver
//!
//! The controller owns the shared transport and one reader thread:
//!
//! ```text
//!   ReceiverController ──write──► Transport ◄──read── ubx-reader thread
//!          │                                              │
//!          └──── Correlator ◄── ack slot (bounded 1) ─────┤
//!                                                         └──► MessageSink
//! ```
//!
//! Configuration is strictly request/response: each step sends one command
//! and blocks until its acknowledgement, a timeout, or an error. A failing
//! step aborts the sequence and leaves the device with whatever was applied
//! before it.

pub mod config_keys;
pub mod constants;
mod correlator;
pub mod packet;
pub mod protocol;
mod reader;
mod ring_buffer;

// Public re-exports
pub use config_keys::PortType;
pub use constants::{CLASS_ACK, CLASS_CFG, CLASS_NAV, ID_ACK_ACK, ID_ACK_NAK};
pub use correlator::{ack_channel, check_acknowledgement, Acknowledgement, Correlator, Frame};
pub use packet::Command;
pub use protocol::{FrameReader, Message, RtcmFrame, UbxPacket};
pub use reader::ReaderStats;

use crate::config::DeviceConfig;
use crate::core::sink::MessageSink;
use crate::core::types::{ControllerState, PositioningMode, Position, RunState};
use crate::error::{Error, Result};
use crate::transport::{discover_receiver_port, SerialTransport, Transport};
use self::constants::DEFAULT_ACK_TIMEOUT_MS;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Poll interval of [`ReceiverController::wait_until_stopped`]
const STOP_POLL_INTERVAL_MS: u64 = 100;

/// Controller settings independent of how the transport was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Port the receiver should emit RTCM3 and NAV-SVIN on
    pub port_type: PortType,
    /// Bound on each acknowledgement wait
    pub ack_timeout: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            port_type: PortType::Usb,
            ack_timeout: Duration::from_millis(DEFAULT_ACK_TIMEOUT_MS),
        }
    }
}

/// RTK base station controller for one receiver session
pub struct ReceiverController {
    /// Shared between the correlator (write) and the reader thread (read)
    transport: Arc<Mutex<Box<dyn Transport>>>,
    correlator: Correlator,
    /// Sender half of the ack slot, moved into the reader thread on start
    ack_tx: Option<Sender<Acknowledgement>>,
    /// Stop flag shared with the reader thread, the relay and the signal handler
    run_state: Arc<RunState>,
    reader_handle: Option<JoinHandle<ReaderStats>>,
    state: ControllerState,
    positioning: Option<PositioningMode>,
    port_type: PortType,
}

impl ReceiverController {
    /// Create a controller over an already opened transport
    pub fn new(
        transport: Box<dyn Transport>,
        run_state: Arc<RunState>,
        settings: ControllerSettings,
    ) -> Self {
        let transport = Arc::new(Mutex::new(transport));
        let (ack_tx, ack_rx) = ack_channel();
        let correlator = Correlator::new(Arc::clone(&transport), ack_rx, settings.ack_timeout);

        Self {
            transport,
            correlator,
            ack_tx: Some(ack_tx),
            run_state,
            reader_handle: None,
            state: ControllerState::Disconnected,
            positioning: None,
            port_type: settings.port_type,
        }
    }

    /// Find the receiver on USB and open it as configured
    pub fn connect(device: &DeviceConfig, run_state: Arc<RunState>) -> Result<Self> {
        let path = discover_receiver_port(&device.selector())?;
        log::info!("Opening receiver on {} at {} baud", path, device.baud_rate);
        let transport = SerialTransport::open(
            &path,
            device.baud_rate,
            Duration::from_millis(device.read_timeout_ms),
        )?;
        Ok(Self::new(
            Box::new(transport),
            run_state,
            device.controller_settings(),
        ))
    }

    /// Launch the reader thread; non-acknowledgement frames go to `sink`
    pub fn start(&mut self, sink: Box<dyn MessageSink>) -> Result<()> {
        if self.state != ControllerState::Disconnected {
            return Err(Error::InvalidState(format!(
                "cannot start controller in state {:?}",
                self.state
            )));
        }
        // The flag may already have been started by another component of the session
        if !self.run_state.start() && !self.run_state.is_running() {
            return Err(Error::InvalidState(
                "session was stopped before the controller started".to_string(),
            ));
        }
        let ack_tx = self
            .ack_tx
            .take()
            .ok_or_else(|| Error::InvalidState("acknowledgement channel already in use".to_string()))?;

        let reader_transport = Arc::clone(&self.transport);
        let reader_state = Arc::clone(&self.run_state);
        self.reader_handle = Some(
            thread::Builder::new()
                .name("ubx-reader".to_string())
                .spawn(move || reader::reader_loop(reader_transport, reader_state, ack_tx, sink))?,
        );

        self.state = ControllerState::Connected;
        log::info!("Receiver controller started");
        Ok(())
    }

    /// Restore the factory configuration; clears any positioning decision
    pub fn factory_reset(&mut self) -> Result<()> {
        self.require_active("factory reset")?;
        log::info!("Resetting receiver to factory defaults");
        self.correlator.send(&packet::factory_reset())?;

        self.state = ControllerState::FactoryReset;
        self.positioning = None;
        Ok(())
    }

    /// Enable the RTCM3 base station messages on the configured port
    pub fn configure_rtcm3(&mut self) -> Result<()> {
        self.require_active("RTCM3 configuration")?;
        if let Some(current) = &self.positioning {
            return Err(Error::InvalidState(format!(
                "RTCM3 outputs must be configured before positioning ({:?} already active)",
                current
            )));
        }
        log::info!("Enabling RTCM3 base outputs on {}", self.port_type);
        self.correlator
            .send(&packet::rtcm3_base_outputs(self.port_type)?)?;

        self.state = ControllerState::Rtcm3Configured;
        Ok(())
    }

    /// Put the receiver in survey-in mode
    pub fn configure_survey_in(
        &mut self,
        accuracy_limit_mm: u32,
        min_duration: Duration,
    ) -> Result<()> {
        self.configure_positioning(&PositioningMode::SurveyIn {
            accuracy_limit_mm,
            min_duration,
        })
    }

    /// Put the receiver in fixed mode at `position`
    pub fn configure_fixed(&mut self, position: Position, accuracy_limit_mm: u32) -> Result<()> {
        self.configure_positioning(&PositioningMode::Fixed {
            position,
            accuracy_limit_mm,
        })
    }

    /// Apply one positioning mode. Only one mode per factory reset.
    pub fn configure_positioning(&mut self, mode: &PositioningMode) -> Result<()> {
        self.require_active("positioning configuration")?;
        if let Some(current) = &self.positioning {
            return Err(Error::InvalidState(format!(
                "positioning already configured as {:?}; factory reset required to change it",
                current
            )));
        }

        let (command, configured) = match mode {
            PositioningMode::SurveyIn {
                accuracy_limit_mm,
                min_duration,
            } => {
                log::info!(
                    "Configuring survey-in: accuracy limit {} mm, minimum {} s",
                    accuracy_limit_mm,
                    min_duration.as_secs()
                );
                (
                    packet::survey_in_mode(*accuracy_limit_mm, *min_duration, self.port_type)?,
                    ControllerState::SurveyIn,
                )
            }
            PositioningMode::Fixed {
                position,
                accuracy_limit_mm,
            } => {
                log::info!(
                    "Configuring fixed position: lat {:.9}, lon {:.9}, alt {:.3} m",
                    position.latitude_degrees,
                    position.longitude_degrees,
                    position.altitude_meters
                );
                (
                    packet::fixed_mode(position, *accuracy_limit_mm)?,
                    ControllerState::Fixed,
                )
            }
        };
        self.correlator.send(&command)?;

        self.state = configured;
        log::info!("Receiver in {:?} mode", configured);
        self.positioning = Some(*mode);
        self.state = ControllerState::Running;
        Ok(())
    }

    /// Full base station sequence: factory reset, RTCM3 outputs, positioning mode
    pub fn startup(&mut self, mode: &PositioningMode) -> Result<()> {
        self.factory_reset()?;
        self.configure_rtcm3()?;
        self.configure_positioning(mode)?;
        log::info!("Base station configured and running");
        Ok(())
    }

    /// Configure, then block until stop is requested.
    ///
    /// The controller is stopped on return either way; a configuration
    /// failure is returned after the reader thread has been joined.
    pub fn run(&mut self, mode: &PositioningMode) -> Result<()> {
        let outcome = self.startup(mode);
        match &outcome {
            Ok(()) => {
                log::info!("Base station running. Press Ctrl-C to stop.");
                self.wait_until_stopped();
            }
            Err(e) => log::error!("Receiver configuration failed: {}", e),
        }
        let stopped = self.stop();
        outcome.and(stopped)
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Mode applied since the last factory reset, if any
    pub fn positioning_mode(&self) -> Option<&PositioningMode> {
        self.positioning.as_ref()
    }

    pub fn run_state(&self) -> Arc<RunState> {
        Arc::clone(&self.run_state)
    }

    pub fn ack_timeout(&self) -> Duration {
        self.correlator.timeout()
    }

    /// Block until someone requests stop on the shared run state
    pub fn wait_until_stopped(&self) {
        while !self.run_state.is_stopped() {
            thread::sleep(Duration::from_millis(STOP_POLL_INTERVAL_MS));
        }
    }

    /// Stop the reader thread and release the transport. Safe to call twice.
    pub fn stop(&mut self) -> Result<()> {
        if self.state == ControllerState::Stopped {
            return Ok(());
        }
        log::info!("Stopping receiver controller...");
        self.run_state.stop();
        self.state = ControllerState::Stopped;

        if let Some(handle) = self.reader_handle.take() {
            let stats = handle.join().map_err(|_| Error::ThreadPanic)?;
            log::debug!("Reader stats: {:?}", stats);
        }

        log::info!("Receiver controller stopped");
        Ok(())
    }

    fn require_active(&self, operation: &str) -> Result<()> {
        match self.state {
            ControllerState::Disconnected | ControllerState::Stopped => Err(Error::InvalidState(
                format!("{} requires a started controller (state {:?})", operation, self.state),
            )),
            _ if !self.run_state.is_running() => Err(Error::InvalidState(format!(
                "{} requested after stop",
                operation
            ))),
            _ => Ok(()),
        }
    }
}

impl Drop for ReceiverController {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
