//! Outbound configuration commands
//!
//! Every command is a UBX packet with a fixed identity; the receiver answers
//! each one with ACK-ACK or ACK-NAK carrying the command's class/id.
//!
//! | Builder                 | Message    | Payload                                  |
//! |-------------------------|------------|------------------------------------------|
//! | [`factory_reset`]       | CFG-CFG    | clear/save/load masks + device mask      |
//! | [`config_set`]          | CFG-VALSET | version, layers, transaction, key/values |
//! | [`rtcm3_base_outputs`]  | CFG-VALSET | RTCM 1005/1077/1087/1097/1127/1230 = 1   |
//! | [`survey_in_mode`]      | CFG-VALSET | TMODE=1, accuracy limit, min duration    |
//! | [`fixed_mode`]          | CFG-VALSET | TMODE=2, LLH position + HP parts         |

use super::config_keys::{self, nav_svin_output_key, rtcm3_output_key, PortType};
use super::constants::*;
use super::protocol::UbxPacket;
use crate::core::encoding::{encode_altitude, encode_coordinate};
use crate::core::types::{ConfigItem, Position};
use crate::error::{Error, Result};
use std::time::Duration;

/// Receiver unit for accuracy limits is 0.1 mm
pub fn internal_accuracy_limit(accuracy_limit_mm: u32) -> i64 {
    i64::from(accuracy_limit_mm) * 10
}

/// Outbound protocol message with a stable identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    identity: &'static str,
    packet: UbxPacket,
}

impl Command {
    fn new(identity: &'static str, class: u8, id: u8, payload: Vec<u8>) -> Self {
        Self {
            identity,
            packet: UbxPacket::new(class, id, payload),
        }
    }

    /// `CLASS-ID` name the acknowledgement must refer to
    pub fn identity(&self) -> &'static str {
        self.identity
    }

    pub fn class(&self) -> u8 {
        self.packet.class
    }

    pub fn id(&self) -> u8 {
        self.packet.id
    }

    pub fn payload(&self) -> &[u8] {
        &self.packet.payload
    }

    /// Serialized UBX frame
    pub fn to_bytes(&self) -> Vec<u8> {
        self.packet.to_bytes()
    }
}

/// CFG-CFG: clear and reload the default configuration from all permanent storage
pub fn factory_reset() -> Command {
    let mut payload = Vec::with_capacity(13);
    payload.extend_from_slice(&CFG_CFG_CLEAR_MASK);
    payload.extend_from_slice(&CFG_CFG_SAVE_MASK);
    payload.extend_from_slice(&CFG_CFG_LOAD_MASK);
    payload.push(CFG_CFG_DEV_BBR | CFG_CFG_DEV_FLASH | CFG_CFG_DEV_EEPROM);
    Command::new("CFG-CFG", CLASS_CFG, ID_CFG_CFG, payload)
}

/// CFG-VALSET for `items`, in order, written to RAM, BBR and flash
pub fn config_set(items: &[ConfigItem]) -> Result<Command> {
    config_set_with(LAYER_RAM | LAYER_BBR | LAYER_FLASH, 0, items)
}

/// CFG-VALSET with explicit layer mask and transaction mode
pub fn config_set_with(layers: u8, transaction: u8, items: &[ConfigItem]) -> Result<Command> {
    if items.is_empty() || items.len() > VALSET_MAX_ITEMS {
        return Err(Error::Config(format!(
            "CFG-VALSET takes 1..={} items, got {}",
            VALSET_MAX_ITEMS,
            items.len()
        )));
    }

    let version = if transaction == 0 { 0x00 } else { 0x01 };
    let mut payload = vec![version, layers, transaction, 0x00];
    for item in items {
        let key = config_keys::lookup(&item.key)?;
        payload.extend_from_slice(&key.id.to_le_bytes());
        payload.extend(key.encode_value(&item.key, item.value)?);
    }
    Ok(Command::new("CFG-VALSET", CLASS_CFG, ID_CFG_VALSET, payload))
}

/// Items enabling the RTCM3 base station message set on `port`
pub fn rtcm3_base_output_items(port: PortType) -> Vec<ConfigItem> {
    RTCM3_BASE_MESSAGES
        .iter()
        .map(|&msg| ConfigItem::new(rtcm3_output_key(msg, port), 1))
        .collect()
}

pub fn rtcm3_base_outputs(port: PortType) -> Result<Command> {
    config_set(&rtcm3_base_output_items(port))
}

/// Items for survey-in mode
pub fn survey_in_items(
    accuracy_limit_mm: u32,
    min_duration: Duration,
    port: PortType,
) -> Vec<ConfigItem> {
    vec![
        ConfigItem::new("CFG_TMODE_MODE", 1),
        ConfigItem::new(
            "CFG_TMODE_SVIN_ACC_LIMIT",
            internal_accuracy_limit(accuracy_limit_mm),
        ),
        ConfigItem::new("CFG_TMODE_SVIN_MIN_DUR", min_duration.as_secs() as i64),
        ConfigItem::new(nav_svin_output_key(port), 1),
    ]
}

pub fn survey_in_mode(
    accuracy_limit_mm: u32,
    min_duration: Duration,
    port: PortType,
) -> Result<Command> {
    config_set(&survey_in_items(accuracy_limit_mm, min_duration, port))
}

/// Items for fixed mode at `position` (LLH)
pub fn fixed_items(position: &Position, accuracy_limit_mm: u32) -> Result<Vec<ConfigItem>> {
    let (height, height_hp) = encode_altitude(position.altitude_meters)?;
    let (lat, lat_hp) = encode_coordinate(position.latitude_degrees)?;
    let (lon, lon_hp) = encode_coordinate(position.longitude_degrees)?;

    Ok(vec![
        ConfigItem::new("CFG_TMODE_MODE", 2),
        ConfigItem::new("CFG_TMODE_POS_TYPE", 1),
        ConfigItem::new(
            "CFG_TMODE_FIXED_POS_ACC",
            internal_accuracy_limit(accuracy_limit_mm),
        ),
        ConfigItem::new("CFG_TMODE_HEIGHT", height),
        ConfigItem::new("CFG_TMODE_HEIGHT_HP", height_hp),
        ConfigItem::new("CFG_TMODE_LAT", lat),
        ConfigItem::new("CFG_TMODE_LAT_HP", lat_hp),
        ConfigItem::new("CFG_TMODE_LON", lon),
        ConfigItem::new("CFG_TMODE_LON_HP", lon_hp),
    ])
}

pub fn fixed_mode(position: &Position, accuracy_limit_mm: u32) -> Result<Command> {
    config_set(&fixed_items(position, accuracy_limit_mm)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::ublox::protocol::{FrameReader, Message};

    #[test]
    fn test_factory_reset_payload() {
        let cmd = factory_reset();
        assert_eq!(cmd.identity(), "CFG-CFG");
        assert_eq!(
            cmd.payload(),
            &[0x1F, 0x1F, 0, 0, 0, 0, 0, 0, 0x1F, 0x1F, 0, 0, 0x07]
        );
    }

    #[test]
    fn test_valset_layout_preserves_order() {
        let cmd = config_set(&[
            ConfigItem::new("CFG_TMODE_MODE", 1),
            ConfigItem::new("CFG_TMODE_SVIN_MIN_DUR", 60),
        ])
        .unwrap();

        assert_eq!(cmd.identity(), "CFG-VALSET");
        assert_eq!(
            cmd.payload(),
            &[
                0x00, 0x07, 0x00, 0x00, // version, layers, transaction, reserved
                0x01, 0x00, 0x03, 0x20, 0x01, // CFG_TMODE_MODE = 1
                0x10, 0x00, 0x03, 0x40, 60, 0, 0, 0, // CFG_TMODE_SVIN_MIN_DUR = 60
            ]
        );
    }

    #[test]
    fn test_rtcm3_outputs() {
        let items = rtcm3_base_output_items(PortType::Usb);
        let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "CFG_MSGOUT_RTCM_3X_TYPE1005_USB",
                "CFG_MSGOUT_RTCM_3X_TYPE1077_USB",
                "CFG_MSGOUT_RTCM_3X_TYPE1087_USB",
                "CFG_MSGOUT_RTCM_3X_TYPE1097_USB",
                "CFG_MSGOUT_RTCM_3X_TYPE1127_USB",
                "CFG_MSGOUT_RTCM_3X_TYPE1230_USB",
            ]
        );
        assert!(items.iter().all(|i| i.value == 1));
        // 4 header bytes + 6 * (4 key + 1 value)
        assert_eq!(rtcm3_base_outputs(PortType::Usb).unwrap().payload().len(), 34);
    }

    #[test]
    fn test_survey_in_items() {
        let items = survey_in_items(50_000, Duration::from_secs(60), PortType::Usb);
        assert_eq!(
            items,
            vec![
                ConfigItem::new("CFG_TMODE_MODE", 1),
                ConfigItem::new("CFG_TMODE_SVIN_ACC_LIMIT", 500_000),
                ConfigItem::new("CFG_TMODE_SVIN_MIN_DUR", 60),
                ConfigItem::new("CFG_MSGOUT_UBX_NAV_SVIN_USB", 1),
            ]
        );
    }

    #[test]
    fn test_fixed_items_for_test_position() {
        let items = fixed_items(&Position::test_position(), 50_000).unwrap();
        let values: Vec<(&str, i64)> = items.iter().map(|i| (i.key.as_str(), i.value)).collect();
        assert_eq!(
            values,
            vec![
                ("CFG_TMODE_MODE", 2),
                ("CFG_TMODE_POS_TYPE", 1),
                ("CFG_TMODE_FIXED_POS_ACC", 500_000),
                ("CFG_TMODE_HEIGHT", 21_530),
                ("CFG_TMODE_HEIGHT_HP", 0),
                ("CFG_TMODE_LAT", 486_467_596),
                ("CFG_TMODE_LAT_HP", 67),
                ("CFG_TMODE_LON", 167_915_550),
                ("CFG_TMODE_LON_HP", 0),
            ]
        );
    }

    #[test]
    fn test_fixed_mode_rejects_non_finite_position() {
        let position = Position::new(f64::NAN, 16.0, 200.0);
        assert!(matches!(
            fixed_mode(&position, 50_000),
            Err(Error::Encoding(_))
        ));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            config_set(&[ConfigItem::new("CFG_NOT_A_KEY", 1)]),
            Err(Error::UnknownConfigKey(_))
        ));
    }

    #[test]
    fn test_command_frames_decode() {
        let cmd = fixed_mode(&Position::test_position(), 50_000).unwrap();
        let mut reader = FrameReader::new();
        reader.extend(&cmd.to_bytes());
        match reader.next_frame() {
            Some(Ok(Message::Ubx(packet))) => {
                assert_eq!(packet.identity(), cmd.identity());
                assert_eq!(packet.payload, cmd.payload());
            }
            other => panic!("expected UBX frame, got {:?}", other),
        }
    }
}
