//! Serial transport and u-blox receiver discovery

use super::Transport;
use crate::error::{Error, Result};
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use std::io::{Read, Write};
use std::time::Duration;

/// USB manufacturer string reported by u-blox receivers
pub const UBLOX_MANUFACTURER: &str = "u-blox AG - www.u-blox.com";
/// USB product string reported by u-blox GNSS receivers
pub const UBLOX_PRODUCT: &str = "u-blox GNSS receiver";

/// Peripheral descriptor strings relevant for discovery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortDescriptor {
    pub path: String,
    pub manufacturer: String,
    pub product: String,
    pub serial_number: String,
}

impl PortDescriptor {
    fn from_port_info(info: &serialport::SerialPortInfo) -> Option<Self> {
        match &info.port_type {
            SerialPortType::UsbPort(usb) => Some(Self {
                path: info.port_name.clone(),
                manufacturer: usb.manufacturer.clone().unwrap_or_default(),
                product: usb.product.clone().unwrap_or_default(),
                serial_number: usb.serial_number.clone().unwrap_or_default(),
            }),
            _ => None,
        }
    }

    /// USB descriptors carry no separate description; product stands in for it
    pub fn is_ublox_receiver(&self) -> bool {
        self.manufacturer == UBLOX_MANUFACTURER && self.product == UBLOX_PRODUCT
    }
}

/// Explicit receiver selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSelector {
    /// Serial port path; skips discovery entirely
    pub port: Option<String>,
    /// USB serial number to pick among several matching receivers
    pub serial_number: Option<String>,
}

/// Pick the receiver port among `ports`.
///
/// Enumeration order is platform dependent, so more than one match without
/// a serial number is reported as ambiguous instead of picking the first.
pub fn select_receiver_port(ports: &[PortDescriptor], selector: &DeviceSelector) -> Result<String> {
    if let Some(ref path) = selector.port {
        return Ok(path.clone());
    }

    let matches: Vec<&PortDescriptor> = ports
        .iter()
        .filter(|p| p.is_ublox_receiver())
        .filter(|p| {
            selector
                .serial_number
                .as_ref()
                .map_or(true, |serial| &p.serial_number == serial)
        })
        .collect();

    match matches.as_slice() {
        [] => Err(Error::NoDeviceFound),
        [only] => Ok(only.path.clone()),
        many => Err(Error::AmbiguousDevice(
            many.iter().map(|p| p.path.clone()).collect(),
        )),
    }
}

/// Enumerate serial peripherals and pick the u-blox receiver
pub fn discover_receiver_port(selector: &DeviceSelector) -> Result<String> {
    if let Some(ref path) = selector.port {
        return Ok(path.clone());
    }

    let ports: Vec<PortDescriptor> = serialport::available_ports()?
        .iter()
        .filter_map(PortDescriptor::from_port_info)
        .collect();
    log::debug!("Found {} USB serial ports", ports.len());

    let path = select_receiver_port(&ports, selector)?;
    log::info!("u-blox GNSS receiver found on {}", path);
    Ok(path)
}

/// Serial transport for UART/USB-CDC communication
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open a serial port (8N1, no flow control)
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyACM0")
    /// * `baud_rate` - Baud rate (receiver default 9600)
    /// * `read_timeout` - Upper bound for a blocking read
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open()?;

        log::info!("Opened serial port: {} at {} baud", path, baud_rate);
        Ok(SerialTransport { port })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.port.write(data)?)
    }

    fn flush(&mut self) -> Result<()> {
        self.port.flush()?;
        Ok(())
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ublox(path: &str, serial: &str) -> PortDescriptor {
        PortDescriptor {
            path: path.to_string(),
            manufacturer: UBLOX_MANUFACTURER.to_string(),
            product: UBLOX_PRODUCT.to_string(),
            serial_number: serial.to_string(),
        }
    }

    fn other(path: &str) -> PortDescriptor {
        PortDescriptor {
            path: path.to_string(),
            manufacturer: "FTDI".to_string(),
            product: "FT232R USB UART".to_string(),
            serial_number: "A50285BI".to_string(),
        }
    }

    #[test]
    fn test_no_device_found() {
        let ports = vec![other("/dev/ttyUSB0")];
        assert!(matches!(
            select_receiver_port(&ports, &DeviceSelector::default()),
            Err(Error::NoDeviceFound)
        ));
    }

    #[test]
    fn test_single_match() {
        let ports = vec![other("/dev/ttyUSB0"), ublox("/dev/ttyACM0", "1")];
        let path = select_receiver_port(&ports, &DeviceSelector::default()).unwrap();
        assert_eq!(path, "/dev/ttyACM0");
    }

    #[test]
    fn test_multiple_matches_are_ambiguous() {
        let ports = vec![ublox("/dev/ttyACM0", "1"), ublox("/dev/ttyACM1", "2")];
        match select_receiver_port(&ports, &DeviceSelector::default()) {
            Err(Error::AmbiguousDevice(paths)) => assert_eq!(paths.len(), 2),
            result => panic!("expected AmbiguousDevice, got {:?}", result),
        }
    }

    #[test]
    fn test_serial_number_disambiguates() {
        let ports = vec![ublox("/dev/ttyACM0", "1"), ublox("/dev/ttyACM1", "2")];
        let selector = DeviceSelector {
            port: None,
            serial_number: Some("2".to_string()),
        };
        assert_eq!(select_receiver_port(&ports, &selector).unwrap(), "/dev/ttyACM1");
    }

    #[test]
    fn test_explicit_port_skips_discovery() {
        let selector = DeviceSelector {
            port: Some("/dev/ttyS5".to_string()),
            serial_number: None,
        };
        assert_eq!(select_receiver_port(&[], &selector).unwrap(), "/dev/ttyS5");
    }

    #[test]
    fn test_partial_signature_does_not_match() {
        let mut port = ublox("/dev/ttyACM0", "1");
        port.product = "u-blox 7 - GPS/GNSS Receiver".to_string();
        assert!(!port.is_ublox_receiver());
    }
}
