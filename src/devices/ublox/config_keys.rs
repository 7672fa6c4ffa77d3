//! Configuration key table (generation 9 configuration interface)
//!
//! Keys are addressed by their documented names (`CFG_TMODE_MODE`,
//! `CFG_MSGOUT_RTCM_3X_TYPE1005_USB`, ...). The storage size is encoded in
//! bits 28..30 of the key ID; signedness comes from the table.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Receiver interface a message output key refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PortType {
    I2c,
    Uart1,
    Uart2,
    #[default]
    Usb,
    Spi,
}

impl PortType {
    /// Suffix used in key names
    pub fn as_str(self) -> &'static str {
        match self {
            PortType::I2c => "I2C",
            PortType::Uart1 => "UART1",
            PortType::Uart2 => "UART2",
            PortType::Usb => "USB",
            PortType::Spi => "SPI",
        }
    }

    /// Key ID offset from the I2C variant of a CFG-MSGOUT key
    fn msgout_offset(self) -> u32 {
        match self {
            PortType::I2c => 0,
            PortType::Uart1 => 1,
            PortType::Uart2 => 2,
            PortType::Usb => 3,
            PortType::Spi => 4,
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        [
            PortType::I2c,
            PortType::Uart1,
            PortType::Uart2,
            PortType::Usb,
            PortType::Spi,
        ]
        .into_iter()
        .find(|p| p.as_str() == suffix)
    }
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved configuration key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigKey {
    pub id: u32,
    pub signed: bool,
}

impl ConfigKey {
    /// Value storage size in bytes
    pub fn size(&self) -> usize {
        match (self.id >> 28) & 0x07 {
            0x01 | 0x02 => 1,
            0x03 => 2,
            0x04 => 4,
            _ => 8,
        }
    }

    /// Little-endian value bytes, range-checked against the storage type
    pub fn encode_value(&self, name: &str, value: i64) -> Result<Vec<u8>> {
        let size = self.size();
        let bits = (size * 8) as u32;
        let fits = match (self.signed, bits) {
            (true, 64) => true,
            (false, 64) => value >= 0,
            (true, b) => {
                let limit = 1i64 << (b - 1);
                (-limit..limit).contains(&value)
            }
            (false, b) => (0..(1i64 << b)).contains(&value),
        };
        if !fits {
            return Err(Error::ConfigValueOutOfRange {
                key: name.to_string(),
                value,
            });
        }
        Ok(value.to_le_bytes()[..size].to_vec())
    }
}

/// CFG-TMODE keys: (name, id, signed)
const TMODE_KEYS: &[(&str, u32, bool)] = &[
    ("CFG_TMODE_MODE", 0x2003_0001, false),
    ("CFG_TMODE_POS_TYPE", 0x2003_0002, false),
    ("CFG_TMODE_ECEF_X", 0x4003_0003, true),
    ("CFG_TMODE_ECEF_Y", 0x4003_0004, true),
    ("CFG_TMODE_ECEF_Z", 0x4003_0005, true),
    ("CFG_TMODE_ECEF_X_HP", 0x2003_0006, true),
    ("CFG_TMODE_ECEF_Y_HP", 0x2003_0007, true),
    ("CFG_TMODE_ECEF_Z_HP", 0x2003_0008, true),
    ("CFG_TMODE_LAT", 0x4003_0009, true),
    ("CFG_TMODE_LON", 0x4003_000A, true),
    ("CFG_TMODE_HEIGHT", 0x4003_000B, true),
    ("CFG_TMODE_LAT_HP", 0x2003_000C, true),
    ("CFG_TMODE_LON_HP", 0x2003_000D, true),
    ("CFG_TMODE_HEIGHT_HP", 0x2003_000E, true),
    ("CFG_TMODE_FIXED_POS_ACC", 0x4003_000F, false),
    ("CFG_TMODE_SVIN_MIN_DUR", 0x4003_0010, false),
    ("CFG_TMODE_SVIN_ACC_LIMIT", 0x4003_0011, false),
];

/// CFG-MSGOUT keys without port suffix, ID of the I2C variant
const MSGOUT_KEYS: &[(&str, u32)] = &[
    ("CFG_MSGOUT_RTCM_3X_TYPE1005", 0x2091_02BD),
    ("CFG_MSGOUT_RTCM_3X_TYPE1077", 0x2091_02CC),
    ("CFG_MSGOUT_RTCM_3X_TYPE1087", 0x2091_02D1),
    ("CFG_MSGOUT_RTCM_3X_TYPE1097", 0x2091_0318),
    ("CFG_MSGOUT_RTCM_3X_TYPE1127", 0x2091_02D6),
    ("CFG_MSGOUT_RTCM_3X_TYPE1230", 0x2091_0303),
    ("CFG_MSGOUT_UBX_NAV_PVT", 0x2091_0006),
    ("CFG_MSGOUT_UBX_NAV_SVIN", 0x2091_0088),
];

/// Resolve a key name to its ID and signedness
pub fn lookup(name: &str) -> Result<ConfigKey> {
    if let Some(&(_, id, signed)) = TMODE_KEYS.iter().find(|(n, _, _)| *n == name) {
        return Ok(ConfigKey { id, signed });
    }

    if let Some((base, suffix)) = name.rsplit_once('_') {
        if let (Some(port), Some(&(_, id))) = (
            PortType::from_suffix(suffix),
            MSGOUT_KEYS.iter().find(|(n, _)| *n == base),
        ) {
            return Ok(ConfigKey {
                id: id + port.msgout_offset(),
                signed: false,
            });
        }
    }

    Err(Error::UnknownConfigKey(name.to_string()))
}

/// Output-rate key name for an RTCM3 message type on `port`
pub fn rtcm3_output_key(message_type: u16, port: PortType) -> String {
    format!("CFG_MSGOUT_RTCM_3X_TYPE{}_{}", message_type, port)
}

/// Output-rate key name for UBX-NAV-SVIN on `port`
pub fn nav_svin_output_key(port: PortType) -> String {
    format!("CFG_MSGOUT_UBX_NAV_SVIN_{}", port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tmode_lookup() {
        let key = lookup("CFG_TMODE_MODE").unwrap();
        assert_eq!(key.id, 0x2003_0001);
        assert_eq!(key.size(), 1);

        let key = lookup("CFG_TMODE_LAT").unwrap();
        assert_eq!(key.size(), 4);
        assert!(key.signed);
    }

    #[test]
    fn test_msgout_port_variants() {
        assert_eq!(
            lookup("CFG_MSGOUT_RTCM_3X_TYPE1005_USB").unwrap().id,
            0x2091_02C0
        );
        assert_eq!(
            lookup("CFG_MSGOUT_RTCM_3X_TYPE1077_UART1").unwrap().id,
            0x2091_02CD
        );
        assert_eq!(lookup("CFG_MSGOUT_UBX_NAV_SVIN_USB").unwrap().id, 0x2091_008B);
        assert_eq!(rtcm3_output_key(1230, PortType::Usb), "CFG_MSGOUT_RTCM_3X_TYPE1230_USB");
    }

    #[test]
    fn test_unknown_key() {
        assert!(matches!(
            lookup("CFG_TMODE_BOGUS"),
            Err(Error::UnknownConfigKey(_))
        ));
        assert!(matches!(
            lookup("CFG_MSGOUT_RTCM_3X_TYPE1005_USB3"),
            Err(Error::UnknownConfigKey(_))
        ));
    }

    #[test]
    fn test_value_encoding_ranges() {
        let hp = lookup("CFG_TMODE_LAT_HP").unwrap();
        assert_eq!(hp.encode_value("CFG_TMODE_LAT_HP", -50).unwrap(), vec![0xCE]);
        assert!(hp.encode_value("CFG_TMODE_LAT_HP", 200).is_err());

        let dur = lookup("CFG_TMODE_SVIN_MIN_DUR").unwrap();
        assert_eq!(
            dur.encode_value("CFG_TMODE_SVIN_MIN_DUR", 60).unwrap(),
            vec![60, 0, 0, 0]
        );
        assert!(dur.encode_value("CFG_TMODE_SVIN_MIN_DUR", -1).is_err());

        let lat = lookup("CFG_TMODE_LAT").unwrap();
        assert_eq!(
            lat.encode_value("CFG_TMODE_LAT", 486_467_596).unwrap(),
            486_467_596i32.to_le_bytes().to_vec()
        );
    }
}
