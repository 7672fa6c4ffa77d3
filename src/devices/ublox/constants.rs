//! Constants for u-blox receivers (UBX / NMEA / RTCM3 on one stream)

// UBX framing
pub const UBX_SYNC_1: u8 = 0xB5;
pub const UBX_SYNC_2: u8 = 0x62;
pub const UBX_HEADER_LEN: usize = 6; // SYNC(2) + CLASS(1) + ID(1) + LEN(2)
pub const UBX_CHECKSUM_LEN: usize = 2;
pub const UBX_MAX_PAYLOAD: usize = 4096;

// NMEA framing
pub const NMEA_START: u8 = b'$';
pub const NMEA_CR: u8 = b'\r';
pub const NMEA_LF: u8 = b'\n';
pub const NMEA_MAX_SENTENCE_LEN: usize = 82;

// RTCM3 framing
pub const RTCM_PREAMBLE: u8 = 0xD3;
pub const RTCM_HEADER_LEN: usize = 3; // PREAMBLE(1) + RESERVED(6 bits) + LEN(10 bits)
pub const RTCM_CRC_LEN: usize = 3;
pub const RTCM_LENGTH_MASK: u16 = 0x03FF;

// Message classes
pub const CLASS_NAV: u8 = 0x01;
pub const CLASS_ACK: u8 = 0x05;
pub const CLASS_CFG: u8 = 0x06;
pub const CLASS_MON: u8 = 0x0A;

// Message IDs
pub const ID_ACK_NAK: u8 = 0x00;
pub const ID_ACK_ACK: u8 = 0x01;
pub const ID_CFG_CFG: u8 = 0x09;
pub const ID_CFG_VALSET: u8 = 0x8A;

// Fixed reset masks (sections ioPort..antConf)
pub const CFG_CFG_CLEAR_MASK: [u8; 4] = [0x1F, 0x1F, 0x00, 0x00];
pub const CFG_CFG_SAVE_MASK: [u8; 4] = [0x00, 0x00, 0x00, 0x00];
pub const CFG_CFG_LOAD_MASK: [u8; 4] = [0x1F, 0x1F, 0x00, 0x00];
pub const CFG_CFG_DEV_BBR: u8 = 0x01;
pub const CFG_CFG_DEV_FLASH: u8 = 0x02;
pub const CFG_CFG_DEV_EEPROM: u8 = 0x04;

// CFG-VALSET layers
pub const LAYER_RAM: u8 = 0x01;
pub const LAYER_BBR: u8 = 0x02;
pub const LAYER_FLASH: u8 = 0x04;
pub const VALSET_MAX_ITEMS: usize = 64;

// Timing
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const SERIAL_READ_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 5000;
pub const READER_POLL_INTERVAL_MS: u64 = 10;
pub const ACK_HANDOFF_RETRY_MS: u64 = 100;

/// RTCM3 messages a base station must emit
/// (ARP, GPS/GLONASS/Galileo/BeiDou MSM7, GLONASS biases)
pub const RTCM3_BASE_MESSAGES: [u16; 6] = [1005, 1077, 1087, 1097, 1127, 1230];

/// Known UBX messages: (class, id, name)
pub const UBX_MESSAGE_NAMES: &[(u8, u8, &str)] = &[
    (CLASS_ACK, ID_ACK_NAK, "ACK-NAK"),
    (CLASS_ACK, ID_ACK_ACK, "ACK-ACK"),
    (CLASS_CFG, 0x00, "CFG-PRT"),
    (CLASS_CFG, 0x01, "CFG-MSG"),
    (CLASS_CFG, 0x04, "CFG-RST"),
    (CLASS_CFG, 0x08, "CFG-RATE"),
    (CLASS_CFG, ID_CFG_CFG, "CFG-CFG"),
    (CLASS_CFG, 0x71, "CFG-TMODE3"),
    (CLASS_CFG, ID_CFG_VALSET, "CFG-VALSET"),
    (CLASS_CFG, 0x8B, "CFG-VALGET"),
    (CLASS_CFG, 0x8C, "CFG-VALDEL"),
    (CLASS_NAV, 0x01, "NAV-POSECEF"),
    (CLASS_NAV, 0x02, "NAV-POSLLH"),
    (CLASS_NAV, 0x03, "NAV-STATUS"),
    (CLASS_NAV, 0x07, "NAV-PVT"),
    (CLASS_NAV, 0x14, "NAV-HPPOSLLH"),
    (CLASS_NAV, 0x35, "NAV-SAT"),
    (CLASS_NAV, 0x3B, "NAV-SVIN"),
    (CLASS_MON, 0x04, "MON-VER"),
    (CLASS_MON, 0x09, "MON-HW"),
];

/// Look up the `CLASS-ID` name of a UBX message
pub fn ubx_message_name(class: u8, id: u8) -> Option<&'static str> {
    UBX_MESSAGE_NAMES
        .iter()
        .find(|&&(c, i, _)| c == class && i == id)
        .map(|&(_, _, name)| name)
}
