use std::fmt::Debug;

use chrono::{NaiveDate, NaiveDateTime};
use xc_sync_core::{LoggerError, ProtocolError, Result};

use crate::abi::Arg;

/// Two decimal digits packed into the nibbles of one byte (`0x23` is 23)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PackedDecimal(u8);

impl PackedDecimal {
    /// Pack a value in `0..=99`
    pub fn new(value: u8) -> Result<Self> {
        if value > 99 {
            return Err(LoggerError::out_of_range("packed decimal", value));
        }
        Ok(Self(((value / 10) << 4) | (value % 10)))
    }

    /// Byte as it appears on the wire.
    #[inline(always)]
    pub fn to_bit_repr(&self) -> u8 {
        self.0
    }

    #[inline(always)]
    pub fn value(&self) -> u8 {
        decode(self.0)
    }
}

/// Decode one packed-decimal byte
#[inline(always)]
pub fn decode(byte: u8) -> u8 {
    ((byte >> 4) & 0xf) * 10 + (byte & 0xf)
}

/// Encode a value in `0..=99` as one packed-decimal byte
#[inline(always)]
pub fn encode(value: u8) -> Result<u8> {
    PackedDecimal::new(value).map(|p| p.to_bit_repr())
}

/// Decode `[yy, mm, dd, hh, mm, ss]` packed-decimal fields, years counted from 2000
pub fn decode_datetime(raw: [u8; 6]) -> std::result::Result<NaiveDateTime, ProtocolError> {
    let [year, month, day, hour, minute, second] = raw.map(decode);
    NaiveDate::from_ymd_opt(2000 + year as i32, month as u32, day as u32)
        .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| ProtocolError::InvalidTimestamp(raw.to_vec()))
}

impl Debug for PackedDecimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PackedDecimal").field(&self.value()).finish()
    }
}

impl Arg for PackedDecimal {
    const SIZE: usize = 1;
    #[inline(always)]
    fn to_bytes(&self) -> Vec<u8> {
        vec![self.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        for v in 0..=99u8 {
            let byte = encode(v).unwrap();
            assert_eq!(decode(byte), v, "{byte:#04x}");
        }
    }

    #[test]
    fn known_bytes() {
        assert_eq!(encode(23).unwrap(), 0x23);
        assert_eq!(decode(0x59), 59);
        assert_eq!(PackedDecimal::new(99).unwrap().value(), 99);
    }

    #[test]
    fn out_of_range() {
        assert!(encode(100).is_err());
        assert!(PackedDecimal::new(255).is_err());
    }

    #[test]
    fn datetime() {
        let t = decode_datetime([0x23, 0x05, 0x18, 0x13, 0x45, 0x09]).unwrap();
        assert_eq!(t.to_string(), "2023-05-18 13:45:09");
        assert_eq!(
            decode_datetime([0x23, 0x13, 0x01, 0, 0, 0]),
            Err(ProtocolError::InvalidTimestamp(vec![0x23, 0x13, 0x01, 0, 0, 0]))
        );
    }

    #[test]
    fn non_decimal_nibbles_follow_formula() {
        // month stored raw on the schedule region still decodes to its value
        assert_eq!(decode(0x0a), 10);
        assert_eq!(decode(0x0c), 12);
        assert_eq!(decode(0xff), 165);
    }
}
