//! LIFX LAN binary protocol: the 36-byte header and the handful of typed
//! payloads this client speaks, all little-endian per the spec.

use crate::error::DiscoError;

/// Message type. Only the subset of the public protocol this client uses
/// is represented.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PType {
    DevGetService,
    DevStateService,
    DevGetPower,
    DevSetPower,
    DevStatePower,
    DevGetVersion,
    DevStateVersion,
    Ack,
    LiGet,
    LiSetColor,
    LiState,
    LiGetPower,
    LiSetPower,
    LiStatePower,
    Unknown(u16),
}

impl PType {
    pub const fn code(self) -> u16 {
        match self {
            PType::DevGetService => 2,
            PType::DevStateService => 3,
            PType::DevGetPower => 20,
            PType::DevSetPower => 21,
            PType::DevStatePower => 22,
            PType::DevGetVersion => 32,
            PType::DevStateVersion => 33,
            PType::Ack => 45,
            PType::LiGet => 101,
            PType::LiSetColor => 102,
            PType::LiState => 107,
            PType::LiGetPower => 116,
            PType::LiSetPower => 117,
            PType::LiStatePower => 118,
            PType::Unknown(c) => c,
        }
    }

    fn from_code(c: u16) -> PType {
        match c {
            2 => PType::DevGetService,
            3 => PType::DevStateService,
            20 => PType::DevGetPower,
            21 => PType::DevSetPower,
            22 => PType::DevStatePower,
            32 => PType::DevGetVersion,
            33 => PType::DevStateVersion,
            45 => PType::Ack,
            101 => PType::LiGet,
            102 => PType::LiSetColor,
            107 => PType::LiState,
            116 => PType::LiGetPower,
            117 => PType::LiSetPower,
            118 => PType::LiStatePower,
            c => PType::Unknown(c),
        }
    }
}

const HEADER_LEN: usize = 36;
const PROTOCOL: u16 = 1024;

/// A decoded (or to-be-encoded) packet header.
#[derive(Clone, Copy, Debug, Default)]
pub struct Header {
    pub tagged: bool,
    pub source: u32,
    pub target: u64,
    pub res: bool,
    pub ack: bool,
    pub sequence: u8,
    pub ptype: u16,
}

impl Header {
    pub fn encode(&self, payload_len: usize) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        let size = (HEADER_LEN + payload_len) as u16;

        let mut pato: u16 = PROTOCOL | (1 << 12);
        if self.tagged {
            pato |= 1 << 13;
        }
        let mut rar: u8 = 0;
        if self.res {
            rar |= 1;
        }
        if self.ack {
            rar |= 1 << 1;
        }

        buf[0..2].copy_from_slice(&size.to_le_bytes());
        buf[2..4].copy_from_slice(&pato.to_le_bytes());
        buf[4..8].copy_from_slice(&self.source.to_le_bytes());
        buf[8..16].copy_from_slice(&self.target.to_le_bytes());
        // bytes 16..22 reserved
        buf[22] = rar;
        buf[23] = self.sequence;
        // bytes 24..32 reserved
        buf[32..34].copy_from_slice(&self.ptype.to_le_bytes());
        // bytes 34..36 reserved
        buf
    }

    pub fn decode(b: &[u8]) -> Result<Header, DiscoError> {
        if b.len() < HEADER_LEN {
            return Err(DiscoError::Protocol(format!(
                "cannot unmarshal {} bytes into packet header",
                b.len()
            )));
        }
        let pato = u16::from_le_bytes([b[2], b[3]]);
        if pato & 0xfff != PROTOCOL {
            return Err(DiscoError::Protocol(format!("invalid protocol: {}", pato & 0xfff)));
        }
        let rar = b[22];
        Ok(Header {
            tagged: pato & (1 << 13) == 1 << 13,
            source: u32::from_le_bytes([b[4], b[5], b[6], b[7]]),
            target: u64::from_le_bytes(b[8..16].try_into().unwrap()),
            res: rar & 1 == 1,
            ack: rar & (1 << 1) == 1 << 1,
            sequence: b[23],
            ptype: u16::from_le_bytes([b[32], b[33]]),
        })
    }
}

/// A decoded payload. Only state-reporting payloads need to be parsed by
/// this client; outgoing payloads are built directly as byte vectors by
/// the packet constructors in `mod.rs`.
#[derive(Clone, Debug)]
pub enum Payload {
    Service { port: u32 },
    Power { level: u16 },
    Version { vendor: u32, product: u32 },
    State {
        h: u16,
        s: u16,
        b: u16,
        k: u16,
        power: u16,
        label: String,
    },
    None,
}

impl Payload {
    pub fn decode(ptype: u16, b: &[u8]) -> Result<Payload, DiscoError> {
        match PType::from_code(ptype) {
            PType::DevStateService => {
                if b.len() < 5 {
                    return Err(DiscoError::Protocol("short service payload".to_string()));
                }
                Ok(Payload::Service {
                    port: u32::from_le_bytes(b[1..5].try_into().unwrap()),
                })
            }
            PType::DevStatePower | PType::LiStatePower => {
                if b.len() < 2 {
                    return Err(DiscoError::Protocol("short power payload".to_string()));
                }
                Ok(Payload::Power {
                    level: u16::from_le_bytes([b[0], b[1]]),
                })
            }
            PType::DevStateVersion => {
                if b.len() < 8 {
                    return Err(DiscoError::Protocol("short version payload".to_string()));
                }
                Ok(Payload::Version {
                    vendor: u32::from_le_bytes(b[0..4].try_into().unwrap()),
                    product: u32::from_le_bytes(b[4..8].try_into().unwrap()),
                })
            }
            PType::LiState => {
                if b.len() < 52 {
                    return Err(DiscoError::Protocol("short state payload".to_string()));
                }
                let h = u16::from_le_bytes([b[0], b[1]]);
                let s = u16::from_le_bytes([b[2], b[3]]);
                let bri = u16::from_le_bytes([b[4], b[5]]);
                let k = u16::from_le_bytes([b[6], b[7]]);
                let power = u16::from_le_bytes([b[10], b[11]]);
                let label_bytes = &b[12..44];
                let nul = label_bytes.iter().position(|&c| c == 0).unwrap_or(label_bytes.len());
                let label = String::from_utf8_lossy(&label_bytes[..nul]).into_owned();
                Ok(Payload::State {
                    h,
                    s,
                    b: bri,
                    k,
                    power,
                    label,
                })
            }
            _ => Ok(Payload::None),
        }
    }
}

/// Builds a `SetColor` payload: `h, s, b, k` (each `0..=u16::MAX`) and a
/// duration in milliseconds.
pub fn set_color_payload(h: u16, s: u16, b: u16, k: u16, duration_ms: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(13);
    buf.push(0);
    buf.extend_from_slice(&h.to_le_bytes());
    buf.extend_from_slice(&s.to_le_bytes());
    buf.extend_from_slice(&b.to_le_bytes());
    buf.extend_from_slice(&k.to_le_bytes());
    buf.extend_from_slice(&duration_ms.to_le_bytes());
    buf
}

/// Builds a `SetPower` payload.
pub fn set_power_payload(level: u16) -> Vec<u8> {
    level.to_le_bytes().to_vec()
}

/// A fully assembled packet: header plus raw payload bytes, plus the
/// address it came from (set by the receive loop) or is destined for.
#[derive(Clone, Debug)]
pub struct Packet {
    pub header: Header,
    pub payload: Vec<u8>,
    pub decoded: Payload,
    pub source_addr: Option<std::net::SocketAddr>,
}

impl Packet {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.header.encode(self.payload.len()).to_vec();
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn decode(b: &[u8]) -> Result<Packet, DiscoError> {
        let header = Header::decode(b)?;
        let decoded = Payload::decode(header.ptype, &b[HEADER_LEN..])?;
        Ok(Packet {
            header,
            payload: b[HEADER_LEN..].to_vec(),
            decoded,
            source_addr: None,
        })
    }
}

/// Ptype numeric codes used when building outgoing headers.
pub mod ptype {
    use super::PType;

    pub const DEV_GET_SERVICE: u16 = PType::DevGetService.code();
    pub const DEV_GET_VERSION: u16 = PType::DevGetVersion.code();
    pub const LI_GET: u16 = PType::LiGet.code();
    pub const LI_SET_COLOR: u16 = PType::LiSetColor.code();
    pub const LI_SET_POWER: u16 = PType::LiSetPower.code();
    pub const LI_STATE: u16 = PType::LiState.code();
    pub const ACK: u16 = PType::Ack.code();
    pub const DEV_STATE_SERVICE: u16 = PType::DevStateService.code();
    pub const DEV_STATE_VERSION: u16 = PType::DevStateVersion.code();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrips() {
        let h = Header {
            tagged: true,
            source: 0xdeadbeef,
            target: 0x1122334455667788,
            res: false,
            ack: true,
            sequence: 7,
            ptype: ptype::LI_SET_COLOR,
        };
        let encoded = h.encode(0);
        let decoded = Header::decode(&encoded).unwrap();
        assert_eq!(decoded.tagged, h.tagged);
        assert_eq!(decoded.source, h.source);
        assert_eq!(decoded.target, h.target);
        assert_eq!(decoded.ack, h.ack);
        assert_eq!(decoded.sequence, h.sequence);
        assert_eq!(decoded.ptype, h.ptype);
    }

    #[test]
    fn rejects_wrong_protocol_tag() {
        let mut buf = [0u8; HEADER_LEN];
        buf[2..4].copy_from_slice(&0u16.to_le_bytes());
        assert!(Header::decode(&buf).is_err());
    }

    #[test]
    fn set_color_payload_is_13_bytes() {
        assert_eq!(set_color_payload(0, 0, 0, 0, 500).len(), 13);
    }
}
