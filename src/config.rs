//! Configuration for the RTK base station
//!
//! Loaded from a TOML file; every section and field is optional and falls
//! back to the defaults below.
//!
//! ```toml
//! [device]
//! port_type = "USB"          # I2C, UART1, UART2, USB, SPI
//!
//! [base]
//! mode = "survey-in"
//! accuracy_limit_mm = 50000
//! min_duration_s = 60
//!
//! [relay]
//! bind_address = "127.0.0.1:2101"
//!
//! [ntrip]
//! enabled = true
//! mountpoint = "MYBASE"
//! password = "secret"
//! ```

use crate::core::types::{PositioningMode, Position};
use crate::devices::ublox::constants::{
    DEFAULT_ACK_TIMEOUT_MS, DEFAULT_BAUD_RATE, SERIAL_READ_TIMEOUT_MS,
};
use crate::devices::ublox::{ControllerSettings, PortType};
use crate::error::{Error, Result};
use crate::transport::DeviceSelector;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub base: BaseConfig,
    pub relay: RelayConfig,
    pub ntrip: NtripConfig,
    pub logging: LoggingConfig,
}

/// Receiver connection
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial port path; discovered by USB descriptor when absent
    pub port: Option<String>,
    /// USB serial number, to pick one of several receivers
    pub serial_number: Option<String>,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    /// Port the receiver is attached through (message output keys)
    pub port_type: PortType,
    /// Bound on each command acknowledgement wait
    pub ack_timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: None,
            serial_number: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: SERIAL_READ_TIMEOUT_MS,
            port_type: PortType::Usb,
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
        }
    }
}

impl DeviceConfig {
    pub fn selector(&self) -> DeviceSelector {
        DeviceSelector {
            port: self.port.clone(),
            serial_number: self.serial_number.clone(),
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            port_type: self.port_type,
            ack_timeout: Duration::from_millis(self.ack_timeout_ms),
        }
    }
}

/// Positioning mode selector in the `[base]` section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaseMode {
    #[default]
    SurveyIn,
    Fixed,
}

/// Base station positioning
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BaseConfig {
    pub mode: BaseMode,
    /// Survey-in accuracy target, or fixed position accuracy (mm)
    pub accuracy_limit_mm: u32,
    /// Survey-in minimum observation time
    pub min_duration_s: u64,
    /// Fixed mode antenna position
    pub latitude_degrees: Option<f64>,
    pub longitude_degrees: Option<f64>,
    pub altitude_meters: Option<f64>,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            mode: BaseMode::SurveyIn,
            accuracy_limit_mm: 50_000,
            min_duration_s: 60,
            latitude_degrees: None,
            longitude_degrees: None,
            altitude_meters: None,
        }
    }
}

impl BaseConfig {
    /// Fixed position, when all three coordinates are present
    pub fn position(&self) -> Option<Position> {
        Some(Position::new(
            self.latitude_degrees?,
            self.longitude_degrees?,
            self.altitude_meters?,
        ))
    }
}

/// Correction relay TCP server
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// TCP bind address for the single correction consumer
    ///
    /// - `127.0.0.1:2101` - local NTRIP publisher only
    /// - `0.0.0.0:2101` - any interface
    pub bind_address: String,
    /// How long to wait for the consumer to connect
    pub accept_timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:2101".to_string(),
            accept_timeout_ms: 10_000,
        }
    }
}

/// NTRIP upload through `str2str`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NtripConfig {
    pub enabled: bool,
    pub mountpoint: String,
    pub password: String,
    pub caster_address: String,
    pub caster_port: u16,
    pub format: String,
    /// Reconnect interval passed to `-r`
    pub reconnect_ms: u64,
    /// Publisher executable
    pub program: String,
}

impl Default for NtripConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mountpoint: String::new(),
            password: String::new(),
            caster_address: "rtk2go.com".to_string(),
            caster_port: 2101,
            format: "rtcm3".to_string(),
            reconnect_ms: 1000,
            program: "str2str".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject combinations the controller or publisher cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.device.baud_rate == 0 {
            return Err(Error::Config("device.baud_rate must be positive".to_string()));
        }
        if self.device.read_timeout_ms == 0 || self.device.ack_timeout_ms == 0 {
            return Err(Error::Config(
                "device timeouts must be positive".to_string(),
            ));
        }
        if self.relay.accept_timeout_ms == 0 {
            return Err(Error::Config(
                "relay.accept_timeout_ms must be positive".to_string(),
            ));
        }
        if self.base.accuracy_limit_mm == 0 {
            return Err(Error::Config(
                "base.accuracy_limit_mm must be positive".to_string(),
            ));
        }
        if self.base.mode == BaseMode::Fixed {
            match self.base.position() {
                Some(position) if position.is_finite() => {}
                Some(_) => {
                    return Err(Error::Config(
                        "base position must be finite".to_string(),
                    ))
                }
                None => {
                    return Err(Error::Config(
                        "fixed mode needs latitude_degrees, longitude_degrees and altitude_meters"
                            .to_string(),
                    ))
                }
            }
        }
        if self.ntrip.enabled && self.ntrip.mountpoint.trim().is_empty() {
            return Err(Error::Config(
                "ntrip.mountpoint is required when NTRIP is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Positioning mode requested by the `[base]` section
    pub fn positioning_mode(&self) -> Result<PositioningMode> {
        match self.base.mode {
            BaseMode::SurveyIn => Ok(PositioningMode::SurveyIn {
                accuracy_limit_mm: self.base.accuracy_limit_mm,
                min_duration: Duration::from_secs(self.base.min_duration_s),
            }),
            BaseMode::Fixed => {
                let position = self.base.position().ok_or_else(|| {
                    Error::Config("fixed mode requires a base position".to_string())
                })?;
                Ok(PositioningMode::Fixed {
                    position,
                    accuracy_limit_mm: self.base.accuracy_limit_mm,
                })
            }
        }
    }
}
