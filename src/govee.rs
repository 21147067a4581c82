//! Decoding of Govee H5055 manufacturer-data advertisements.
//!
//! The thermometer has six probe sockets and broadcasts them two at a time. Each
//! advertisement carries a pair indicator followed by two temperature/alarm
//! records:
//!
//! | offset | size | content                                  |
//! |--------|------|------------------------------------------|
//! | 2      | 1    | battery percent                          |
//! | 5      | 1    | pair indicator, bits 2..3 select the pair |
//! | 8      | 2    | first probe temperature, i16 LE, °C      |
//! | 10     | 2    | first probe alarm, u16 LE, `0xFFFF` unset |
//! | 14     | 2    | second probe temperature, i16 LE, °C     |
//! | 16     | 2    | second probe alarm, u16 LE, `0xFFFF` unset |

use num_enum::TryFromPrimitive;

pub const MODEL: &str = "H5055";
pub const PAYLOAD_LENGTH: usize = 20;
pub const PROBE_COUNT: u8 = 6;
/// Bluetooth SIG company id Govee advertises its manufacturer data under.
pub const COMPANY_ID: u16 = 0xEC88;

const UNSET: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum ProbePair {
    First = 0,
    Second = 1,
    Third = 2,
}

impl ProbePair {
    pub const COUNT: usize = PROBE_COUNT as usize / 2;

    /// 1-based index of the first probe carried by this pair.
    pub fn base(self) -> u8 {
        self as u8 * 2 + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeData {
    pub probe: u8,
    pub celsius: f32,
    pub alarm: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Advertisement {
    pub battery: u8,
    pub pair: ProbePair,
    pub probes: Vec<ProbeData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    Length(usize),
    UnknownPair(u8),
}

/// Whether an advertising device is an H5055.
///
/// A device that reports a name is only accepted when the name carries the model.
/// Unnamed devices are accepted on Govee's company id and the payload length.
pub fn is_h5055(local_name: Option<&str>, company: u16, payload: &[u8]) -> bool {
    match local_name {
        Some(name) => name.contains(MODEL),
        None => company == COMPANY_ID && payload.len() == PAYLOAD_LENGTH,
    }
}

pub fn decode(payload: &[u8]) -> Result<Advertisement, DecodeError> {
    if payload.len() != PAYLOAD_LENGTH {
        return Err(DecodeError::Length(payload.len()));
    }

    let indicator = (payload[5] >> 2) & 0b11;
    let pair = ProbePair::try_from(indicator).map_err(|_| DecodeError::UnknownPair(indicator))?;

    let probes = [8, 14]
        .iter()
        .enumerate()
        .filter_map(|(i, offset)| {
            let raw = u16::from_le_bytes([payload[*offset], payload[offset + 1]]);
            let alarm = u16::from_le_bytes([payload[offset + 2], payload[offset + 3]]);
            let celsius = raw as i16;
            // unplugged probes report 0xFFFF or a non-positive value
            if raw == UNSET || celsius <= 0 {
                return None;
            }
            Some(ProbeData {
                probe: pair.base() + i as u8,
                celsius: f32::from(celsius),
                alarm: (alarm != UNSET).then(|| f32::from(alarm as i16)),
            })
        })
        .collect();

    Ok(Advertisement {
        battery: payload[2],
        pair,
        probes,
    })
}
