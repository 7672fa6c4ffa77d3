//! Frame splitter for the multiplexed receiver output
//!
//! The receiver interleaves three protocols on one stream:
//!
//! ```text
//! UBX   [0xB5 0x62] [CLASS] [ID] [LEN_LO LEN_HI] [PAYLOAD] [CK_A CK_B]
//! NMEA  '$' <ascii sentence> ['*' HH] '\r' '\n'
//! RTCM3 [0xD3] [6 bits reserved | 10 bits LEN] [PAYLOAD] [CRC24Q (3)]
//! ```
//!
//! `FrameReader` buffers raw bytes and yields one [`Message`] per complete,
//! validated frame. Bytes that start no known frame are skipped silently; a
//! frame failing validation yields one [`DecodeError`] and the reader resyncs
//! one byte further.

use super::constants::*;
use super::ring_buffer::RingBuffer;
use crate::error::DecodeError;

/// UBX checksum (8-bit Fletcher over CLASS..PAYLOAD)
pub fn ubx_checksum(data: &[u8]) -> (u8, u8) {
    data.iter().fold((0u8, 0u8), |(a, b), &x| {
        let a = a.wrapping_add(x);
        (a, b.wrapping_add(a))
    })
}

/// CRC-24Q as used by RTCM3 framing
pub fn crc24q(data: &[u8]) -> u32 {
    const POLY: u32 = 0x0186_4CFB;
    let mut crc = 0u32;
    for &byte in data {
        crc ^= u32::from(byte) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= POLY;
            }
        }
    }
    crc & 0x00FF_FFFF
}

/// NMEA checksum (XOR of the characters between '$' and '*')
pub fn nmea_checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

/// Decoded UBX packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UbxPacket {
    pub class: u8,
    pub id: u8,
    pub payload: Vec<u8>,
}

impl UbxPacket {
    pub fn new(class: u8, id: u8, payload: Vec<u8>) -> Self {
        Self { class, id, payload }
    }

    /// `CLASS-ID` name, e.g. `ACK-ACK`; hex pair for unnamed messages
    pub fn identity(&self) -> String {
        match ubx_message_name(self.class, self.id) {
            Some(name) => name.to_string(),
            None => format!("0x{:02X}-0x{:02X}", self.class, self.id),
        }
    }

    /// Serialize with sync bytes, length and checksum
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(UBX_HEADER_LEN + self.payload.len() + UBX_CHECKSUM_LEN);
        bytes.extend_from_slice(&[UBX_SYNC_1, UBX_SYNC_2, self.class, self.id]);
        bytes.extend_from_slice(&(self.payload.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&self.payload);
        let (ck_a, ck_b) = ubx_checksum(&bytes[2..]);
        bytes.push(ck_a);
        bytes.push(ck_b);
        bytes
    }
}

/// Complete RTCM3 frame, kept verbatim for relaying
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcmFrame {
    /// 12-bit message number (0 for empty payloads)
    pub message_type: u16,
    /// Preamble, header, payload and CRC
    pub bytes: Vec<u8>,
}

/// One decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Ubx(UbxPacket),
    /// Sentence without the trailing CR/LF
    Nmea(String),
    Rtcm(RtcmFrame),
}

const LEAD_BYTES: [u8; 3] = [UBX_SYNC_1, NMEA_START, RTCM_PREAMBLE];

/// Ring-buffer based frame splitter
pub struct FrameReader {
    buffer: RingBuffer,
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            buffer: RingBuffer::new(),
        }
    }

    /// Feed raw bytes from the transport
    pub fn extend(&mut self, bytes: &[u8]) {
        let dropped = self.buffer.extend(bytes);
        if dropped > 0 {
            log::warn!("Frame buffer full, dropped {} bytes", dropped);
        }
    }

    /// Bytes buffered but not yet consumed
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Next complete frame, `None` when more bytes are needed
    pub fn next_frame(&mut self) -> Option<Result<Message, DecodeError>> {
        loop {
            let Some(lead) = self.buffer.position_of_any(&LEAD_BYTES) else {
                self.buffer.advance(self.buffer.len());
                return None;
            };
            self.buffer.advance(lead);

            let step = match self.buffer.get(0)? {
                UBX_SYNC_1 => self.try_ubx(),
                NMEA_START => self.try_nmea(),
                _ => self.try_rtcm(),
            };

            match step {
                Step::Frame(result) => return Some(result),
                Step::NeedMore => return None,
                Step::Skip => self.buffer.advance(1),
            }
        }
    }

    fn try_ubx(&mut self) -> Step {
        let Some(sync2) = self.buffer.get(1) else {
            return Step::NeedMore;
        };
        if sync2 != UBX_SYNC_2 {
            return Step::Skip;
        }
        if self.buffer.len() < UBX_HEADER_LEN {
            return Step::NeedMore;
        }

        let (Some(class), Some(id), Some(len_lo), Some(len_hi)) = (
            self.buffer.get(2),
            self.buffer.get(3),
            self.buffer.get(4),
            self.buffer.get(5),
        ) else {
            return Step::NeedMore;
        };
        let payload_len = u16::from_le_bytes([len_lo, len_hi]) as usize;
        if payload_len > UBX_MAX_PAYLOAD {
            self.buffer.advance(1);
            return Step::Frame(Err(DecodeError::UbxOversized(payload_len)));
        }

        let total_len = UBX_HEADER_LEN + payload_len + UBX_CHECKSUM_LEN;
        let Some(frame) = self.buffer.copy_range(0, total_len) else {
            return Step::NeedMore;
        };

        let (ck_a, ck_b) = ubx_checksum(&frame[2..total_len - UBX_CHECKSUM_LEN]);
        if frame[total_len - 2] != ck_a || frame[total_len - 1] != ck_b {
            self.buffer.advance(1);
            return Step::Frame(Err(DecodeError::UbxChecksum { class, id }));
        }

        self.buffer.advance(total_len);
        let payload = frame[UBX_HEADER_LEN..total_len - UBX_CHECKSUM_LEN].to_vec();
        Step::Frame(Ok(Message::Ubx(UbxPacket::new(class, id, payload))))
    }

    fn try_nmea(&mut self) -> Step {
        let Some(lf) = self.buffer.position_from(1, NMEA_LF) else {
            if self.buffer.len() > NMEA_MAX_SENTENCE_LEN {
                self.buffer.advance(1);
                return Step::Frame(Err(DecodeError::InvalidNmea(
                    "no terminator within 82 characters".to_string(),
                )));
            }
            return Step::NeedMore;
        };

        let total_len = lf + 1;
        if total_len > NMEA_MAX_SENTENCE_LEN {
            self.buffer.advance(1);
            return Step::Frame(Err(DecodeError::InvalidNmea(format!(
                "sentence of {} characters",
                total_len
            ))));
        }

        let Some(raw) = self.buffer.copy_range(0, total_len) else {
            return Step::NeedMore;
        };
        match parse_nmea(&raw) {
            Ok(sentence) => {
                self.buffer.advance(total_len);
                Step::Frame(Ok(Message::Nmea(sentence)))
            }
            Err(e) => {
                self.buffer.advance(1);
                Step::Frame(Err(e))
            }
        }
    }

    fn try_rtcm(&mut self) -> Step {
        let (Some(hi), Some(lo)) = (self.buffer.get(1), self.buffer.get(2)) else {
            return Step::NeedMore;
        };
        // Reserved bits must be zero, otherwise this is not a preamble
        if hi & 0xFC != 0 {
            return Step::Skip;
        }

        let payload_len = (u16::from_be_bytes([hi, lo]) & RTCM_LENGTH_MASK) as usize;
        let total_len = RTCM_HEADER_LEN + payload_len + RTCM_CRC_LEN;
        let Some(frame) = self.buffer.copy_range(0, total_len) else {
            return Step::NeedMore;
        };

        let body_len = total_len - RTCM_CRC_LEN;
        let expected = crc24q(&frame[..body_len]);
        let actual = u32::from_be_bytes([0, frame[body_len], frame[body_len + 1], frame[body_len + 2]]);
        if expected != actual {
            self.buffer.advance(1);
            return Step::Frame(Err(DecodeError::RtcmCrc { expected, actual }));
        }

        let message_type = if payload_len >= 2 {
            (u16::from(frame[3]) << 4) | (u16::from(frame[4]) >> 4)
        } else {
            0
        };
        self.buffer.advance(total_len);
        Step::Frame(Ok(Message::Rtcm(RtcmFrame {
            message_type,
            bytes: frame,
        })))
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

enum Step {
    Frame(Result<Message, DecodeError>),
    NeedMore,
    Skip,
}

fn parse_nmea(raw: &[u8]) -> Result<String, DecodeError> {
    let Some(body) = raw.strip_suffix(&[NMEA_CR, NMEA_LF]) else {
        return Err(DecodeError::InvalidNmea("missing CR before LF".to_string()));
    };
    if !body.iter().all(|b| b.is_ascii() && !b.is_ascii_control()) {
        return Err(DecodeError::InvalidNmea("non-printable character".to_string()));
    }
    // All bytes are printable ASCII at this point
    let sentence = String::from_utf8_lossy(body).into_owned();

    if let Some((content, checksum)) = sentence[1..].split_once('*') {
        let expected = u8::from_str_radix(checksum, 16)
            .map_err(|_| DecodeError::InvalidNmea(format!("bad checksum field '{}'", checksum)))?;
        let actual = nmea_checksum(content);
        if expected != actual {
            return Err(DecodeError::InvalidNmea(format!(
                "checksum {:02X} != {:02X}",
                actual, expected
            )));
        }
    }
    Ok(sentence)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GGA: &str = "$GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,*76";
    const RTCM_1005: &str = "D300133ED7D30202980EDEEF34B4BD62AC0941986F33360B98";

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn nmea_bytes(s: &str) -> Vec<u8> {
        format!("{}\r\n", s).into_bytes()
    }

    #[test]
    fn test_ack_ack_serialization() {
        let ack = UbxPacket::new(CLASS_ACK, ID_ACK_ACK, vec![CLASS_CFG, ID_CFG_VALSET]);
        assert_eq!(
            ack.to_bytes(),
            vec![0xB5, 0x62, 0x05, 0x01, 0x02, 0x00, 0x06, 0x8A, 0x98, 0xC1]
        );
        assert_eq!(ack.identity(), "ACK-ACK");
        assert_eq!(UbxPacket::new(0x27, 0x03, vec![]).identity(), "0x27-0x03");
    }

    #[test]
    fn test_crc24q_reference_frame() {
        let frame = hex(RTCM_1005);
        assert_eq!(crc24q(&frame[..frame.len() - 3]), 0x360B98);
    }

    #[test]
    fn test_decodes_all_three_protocols() {
        let ubx = UbxPacket::new(CLASS_NAV, 0x3B, vec![1, 2, 3, 4]);
        let mut stream = ubx.to_bytes();
        stream.extend(nmea_bytes(GGA));
        stream.extend(hex(RTCM_1005));

        let mut reader = FrameReader::new();
        reader.extend(&stream);

        assert_eq!(reader.next_frame(), Some(Ok(Message::Ubx(ubx))));
        assert_eq!(reader.next_frame(), Some(Ok(Message::Nmea(GGA.to_string()))));
        match reader.next_frame() {
            Some(Ok(Message::Rtcm(frame))) => {
                assert_eq!(frame.message_type, 1005);
                assert_eq!(frame.bytes, hex(RTCM_1005));
            }
            other => panic!("expected RTCM frame, got {:?}", other),
        }
        assert_eq!(reader.next_frame(), None);
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn test_partial_frame_waits_for_more_bytes() {
        let bytes = UbxPacket::new(CLASS_ACK, ID_ACK_ACK, vec![CLASS_CFG, ID_CFG_CFG]).to_bytes();
        let mut reader = FrameReader::new();

        reader.extend(&bytes[..5]);
        assert_eq!(reader.next_frame(), None);
        reader.extend(&bytes[5..]);
        assert!(matches!(reader.next_frame(), Some(Ok(Message::Ubx(_)))));
    }

    #[test]
    fn test_garbage_is_skipped() {
        let mut stream = vec![0x00, 0x13, 0xB5, 0x00, 0xFF];
        stream.extend(nmea_bytes(GGA));

        let mut reader = FrameReader::new();
        reader.extend(&stream);
        assert_eq!(reader.next_frame(), Some(Ok(Message::Nmea(GGA.to_string()))));
    }

    #[test]
    fn test_bad_ubx_checksum_reports_and_resyncs() {
        let mut corrupt = UbxPacket::new(CLASS_NAV, 0x07, vec![9; 8]).to_bytes();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xFF;
        let good = UbxPacket::new(CLASS_NAV, 0x3B, vec![7; 4]);

        let mut stream = corrupt;
        stream.extend(good.to_bytes());

        let mut reader = FrameReader::new();
        reader.extend(&stream);

        assert_eq!(
            reader.next_frame(),
            Some(Err(DecodeError::UbxChecksum {
                class: CLASS_NAV,
                id: 0x07
            }))
        );
        assert_eq!(reader.next_frame(), Some(Ok(Message::Ubx(good))));
    }

    #[test]
    fn test_bad_nmea_checksum() {
        let mut reader = FrameReader::new();
        reader.extend(&nmea_bytes(&GGA.replace("*76", "*77")));
        assert!(matches!(
            reader.next_frame(),
            Some(Err(DecodeError::InvalidNmea(_)))
        ));
    }

    #[test]
    fn test_bad_rtcm_crc() {
        let mut frame = hex(RTCM_1005);
        frame[5] ^= 0x01;
        let mut reader = FrameReader::new();
        reader.extend(&frame);
        assert!(matches!(
            reader.next_frame(),
            Some(Err(DecodeError::RtcmCrc { .. }))
        ));
    }
}
