//! Configuration block codec.
//!
//! The block read from [`CONFIG_ADDRESS`] is laid out as:
//!
//! | bytes | field |
//! |-------|-------|
//! | 0..4  | serial id (opaque) |
//! | 4     | [`ConfigRegister`] |
//! | 5..7  | sample interval in seconds, big endian, top bit ignored |
//! | 7..9  | temperature offset, `(offset + 10.0) * 10`, big endian |
//! | 9     | humidity offset, `offset + 20` |
//!
//! The register byte carries bits this codec does not interpret, so writes
//! always merge into the register previously read from the device.

use tracing::{debug, warn};
use xc_sync_core::{LoggerError, ProtocolError, Result};

use crate::abi::{self, Arg};
use crate::types::{DateFormat, Mode, SerialId, TemperatureUnit, TimeFormat};

/// Memory address of the configuration block
pub const CONFIG_ADDRESS: u16 = 0x0005;
/// Length of the configuration block
pub const CONFIG_LEN: usize = 10;

/// Intervals accepted below one minute
pub const SHORT_INTERVALS: [u16; 7] = [8, 16, 24, 32, 40, 48, 56];
/// Fallback for an unsupported short interval
pub const DEFAULT_INTERVAL: u16 = 32;
/// Longest interval, 240 minutes
pub const MAX_INTERVAL: u16 = 240 * 60;
/// Temperature offset range in celsius
pub const TEMPERATURE_OFFSET_RANGE: std::ops::RangeInclusive<f32> = -10.0..=10.0;
/// Humidity offset range in percent
pub const HUMIDITY_OFFSET_RANGE: std::ops::RangeInclusive<i16> = -20..=20;

/// Interval high byte bit with no known meaning
const INTERVAL_FLAG: u16 = 0x8000;

/// Raw configuration register byte
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfigRegister(u8);

impl ConfigRegister {
    pub const LCD_AUTO_OFF: u8 = 0x20;

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Replace the bits under `mask`, preserving every other bit
    #[inline(always)]
    pub const fn merge(self, mask: u8, value: u8) -> Self {
        Self((self.0 & !mask) | (value & mask))
    }

    pub fn mode(&self) -> std::result::Result<Mode, ProtocolError> {
        Mode::from_bits(self.0)
    }

    pub fn lcd_auto_off(&self) -> bool {
        self.0 & Self::LCD_AUTO_OFF != 0
    }

    pub fn time_format(&self) -> TimeFormat {
        TimeFormat::from_bits(self.0)
    }

    pub fn date_format(&self) -> DateFormat {
        DateFormat::from_bits(self.0)
    }

    pub fn temperature_unit(&self) -> TemperatureUnit {
        TemperatureUnit::from_bits(self.0)
    }

    pub fn with_mode(self, mode: Mode) -> Self {
        self.merge(Mode::MASK, mode as u8)
    }

    pub fn with_lcd_auto_off(self, enabled: bool) -> Self {
        self.merge(Self::LCD_AUTO_OFF, if enabled { Self::LCD_AUTO_OFF } else { 0 })
    }

    pub fn with_time_format(self, format: TimeFormat) -> Self {
        self.merge(TimeFormat::MASK, format as u8)
    }

    pub fn with_date_format(self, format: DateFormat) -> Self {
        self.merge(DateFormat::MASK, format as u8)
    }

    pub fn with_temperature_unit(self, unit: TemperatureUnit) -> Self {
        self.merge(TemperatureUnit::MASK, unit as u8)
    }
}

impl Arg for ConfigRegister {
    const SIZE: usize = 1;
    #[inline(always)]
    fn to_bytes(&self) -> Vec<u8> {
        vec![self.0]
    }
}

/// Decoded device configuration
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceConfig {
    pub serial_id: SerialId,
    /// Register byte as read. Fields below are merged into it on write.
    pub register: ConfigRegister,
    pub mode: Mode,
    pub lcd_auto_off: bool,
    pub time_format: TimeFormat,
    pub date_format: DateFormat,
    pub temperature_unit: TemperatureUnit,
    /// Seconds between samples
    pub sample_interval: u16,
    /// Calibration added to temperature readings, in celsius
    pub temperature_offset: f32,
    /// Calibration added to humidity readings, in percent
    pub humidity_offset: i16,
}

impl DeviceConfig {
    /// Decode the configuration block
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let block: &[u8; CONFIG_LEN] = payload
            .get(..CONFIG_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or(ProtocolError::ShortRead {
                address: CONFIG_ADDRESS,
                expected: CONFIG_LEN,
                actual: payload.len(),
            })?;

        let register = ConfigRegister::from_bits(block[4]);
        let interval = u16::from_be_bytes([block[5], block[6]]);
        if interval & INTERVAL_FLAG != 0 {
            debug!("interval flag bit set, ignoring");
        }

        Ok(Self {
            serial_id: SerialId([block[0], block[1], block[2], block[3]]),
            register,
            mode: register.mode()?,
            lcd_auto_off: register.lcd_auto_off(),
            time_format: register.time_format(),
            date_format: register.date_format(),
            temperature_unit: register.temperature_unit(),
            sample_interval: interval & !INTERVAL_FLAG,
            temperature_offset: decode_temperature_offset(u16::from_be_bytes([
                block[7], block[8],
            ])),
            humidity_offset: block[9] as i16 - 20,
        })
    }

    /// Encode for writing, merging the display/mode fields into the register
    /// that was read.
    ///
    /// Interval and offsets are normalized first; out of range values are
    /// corrected with a warning rather than rejected.
    pub fn encode(&self) -> ConfigWrite {
        ConfigWrite {
            register: self
                .register
                .with_mode(self.mode)
                .with_lcd_auto_off(self.lcd_auto_off)
                .with_time_format(self.time_format)
                .with_date_format(self.date_format)
                .with_temperature_unit(self.temperature_unit),
            interval: normalize_interval(self.sample_interval as u32),
            temperature_offset: normalize_temperature_offset(self.temperature_offset),
            humidity_offset: normalize_humidity_offset(self.humidity_offset),
        }
    }
}

/// Wire ready configuration fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigWrite {
    pub register: ConfigRegister,
    pub interval: u16,
    pub temperature_offset: u16,
    pub humidity_offset: u8,
}

impl ConfigWrite {
    /// Build the write configuration command payload
    pub fn payload(&self) -> Vec<u8> {
        abi::write_config(
            self.register,
            self.interval,
            self.temperature_offset,
            self.humidity_offset,
        )
    }
}

#[inline(always)]
fn decode_temperature_offset(raw: u16) -> f32 {
    (raw as i32 - 100) as f32 / 10.0
}

/// Check a sample interval against the values the device supports
pub fn validate_interval(secs: u32) -> Result<u16> {
    let valid = if secs < 60 {
        SHORT_INTERVALS.contains(&(secs as u16))
    } else {
        secs <= MAX_INTERVAL as u32 && secs % 60 == 0
    };
    valid
        .then_some(secs as u16)
        .ok_or_else(|| LoggerError::out_of_range("sample interval", secs))
}

/// Coerce a sample interval into a supported value.
///
/// Unsupported short intervals fall back to 32 seconds, long ones clamp to
/// 240 minutes, anything else rounds to the nearest whole minute.
pub fn normalize_interval(secs: u32) -> u16 {
    match validate_interval(secs) {
        Ok(secs) => secs,
        Err(e) => {
            let fixed = if secs < 60 {
                DEFAULT_INTERVAL
            } else if secs > MAX_INTERVAL as u32 {
                MAX_INTERVAL
            } else {
                ((secs + 30) / 60 * 60) as u16
            };
            warn!("{e}, using {fixed} seconds");
            fixed
        },
    }
}

/// Encode a temperature offset, rejecting anything outside -10.0..=10.0
pub fn validate_temperature_offset(offset: f32) -> Result<u16> {
    TEMPERATURE_OFFSET_RANGE
        .contains(&offset)
        .then(|| ((offset + 10.0) * 10.0).round() as u16)
        .ok_or_else(|| LoggerError::out_of_range("temperature offset", offset))
}

/// Encode a temperature offset, defaulting to 0.0 when out of range
pub fn normalize_temperature_offset(offset: f32) -> u16 {
    validate_temperature_offset(offset).unwrap_or_else(|e| {
        warn!("{e}, using 0.0");
        100
    })
}

/// Encode a humidity offset, rejecting anything outside -20..=20
pub fn validate_humidity_offset(offset: i16) -> Result<u8> {
    HUMIDITY_OFFSET_RANGE
        .contains(&offset)
        .then(|| (offset + 20) as u8)
        .ok_or_else(|| LoggerError::out_of_range("humidity offset", offset))
}

/// Encode a humidity offset, defaulting to 0 when out of range
pub fn normalize_humidity_offset(offset: i16) -> u8 {
    validate_humidity_offset(offset).unwrap_or_else(|e| {
        warn!("{e}, using 0");
        20
    })
}
