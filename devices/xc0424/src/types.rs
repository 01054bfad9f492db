use std::fmt::Display;
use std::str::FromStr;

use xc_sync_core::ProtocolError;

/// Recording mode, bits `0x18` of the configuration register
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    /// Record until storage is full, then stop
    Acyclic = 0x00,
    /// Record continuously, overwriting the oldest blocks
    #[default]
    Cyclic = 0x08,
    /// Record only inside the scheduled windows
    Segmented = 0x10,
}

impl Mode {
    pub const MASK: u8 = 0x18;
    pub const OPTIONS: &'static str = "[ acyclic|a, cyclic|c, segmented|s ]";

    pub fn from_bits(bits: u8) -> Result<Self, ProtocolError> {
        match bits & Self::MASK {
            0x00 => Ok(Self::Acyclic),
            0x08 => Ok(Self::Cyclic),
            0x10 => Ok(Self::Segmented),
            other => Err(ProtocolError::UnknownMode(other)),
        }
    }
}

impl FromStr for Mode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "acyclic" | "a" => Ok(Self::Acyclic),
            "cyclic" | "c" => Ok(Self::Cyclic),
            "segmented" | "s" => Ok(Self::Segmented),
            _ => Err(format!("invalid mode, must be one of: {}", Self::OPTIONS)),
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Acyclic => "acyclic",
            Self::Cyclic => "cyclic",
            Self::Segmented => "segmented",
        })
    }
}

/// Clock display, bit `0x04`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum TimeFormat {
    H12 = 0x00,
    #[default]
    H24 = 0x04,
}

impl TimeFormat {
    pub const MASK: u8 = 0x04;

    pub fn from_bits(bits: u8) -> Self {
        if bits & Self::MASK != 0 {
            Self::H24
        } else {
            Self::H12
        }
    }
}

impl FromStr for TimeFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "12" | "12h" => Ok(Self::H12),
            "24" | "24h" => Ok(Self::H24),
            _ => Err("invalid time format, must be one of: [ 12, 24 ]".into()),
        }
    }
}

impl Display for TimeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::H12 => "12h",
            Self::H24 => "24h",
        })
    }
}

/// Date display order, bit `0x02`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum DateFormat {
    #[default]
    DayMonth = 0x00,
    MonthDay = 0x02,
}

impl DateFormat {
    pub const MASK: u8 = 0x02;

    pub fn from_bits(bits: u8) -> Self {
        if bits & Self::MASK != 0 {
            Self::MonthDay
        } else {
            Self::DayMonth
        }
    }
}

impl FromStr for DateFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dm" => Ok(Self::DayMonth),
            "md" => Ok(Self::MonthDay),
            _ => Err("invalid date format, must be one of: [ dm, md ]".into()),
        }
    }
}

impl Display for DateFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::DayMonth => "DM",
            Self::MonthDay => "MD",
        })
    }
}

/// Temperature display unit, bit `0x01`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum TemperatureUnit {
    Fahrenheit = 0x00,
    #[default]
    Celsius = 0x01,
}

impl TemperatureUnit {
    pub const MASK: u8 = 0x01;

    pub fn from_bits(bits: u8) -> Self {
        if bits & Self::MASK != 0 {
            Self::Celsius
        } else {
            Self::Fahrenheit
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "c" | "celsius" => Ok(Self::Celsius),
            "f" | "fahrenheit" => Ok(Self::Fahrenheit),
            _ => Err("invalid unit, must be one of: [ c, f ]".into()),
        }
    }
}

impl Display for TemperatureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Celsius => "C",
            Self::Fahrenheit => "F",
        })
    }
}

/// Opaque 4 byte identifier at the start of the configuration block.
/// Constant per unit and assumed to be a serial number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SerialId(pub [u8; 4]);

impl Display for SerialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in self.0 {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

/// One humidity/temperature pair as stored by the device
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// Relative humidity in percent
    pub humidity: i16,
    /// Temperature in celsius
    pub temperature: f32,
}

impl Reading {
    /// Decode a `[humidity, temp_hi, temp_lo]` sample group.
    ///
    /// Stored values are biased so the calibration offsets can never push
    /// them negative: humidity by 20, temperature by 50.0C in 0.1C steps.
    pub fn from_group(group: [u8; 3]) -> Self {
        let [h, hi, lo] = group;
        Self {
            humidity: decode_humidity(h),
            temperature: decode_temperature([hi, lo]),
        }
    }

    /// Temperature in fahrenheit
    pub fn fahrenheit(&self) -> f32 {
        celsius_to_fahrenheit(self.temperature)
    }
}

/// Highest and lowest readings since the last reset
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extremes {
    pub max: Reading,
    pub min: Reading,
}

impl Extremes {
    pub const LEN: usize = 6;

    /// Decode `[max_t_hi, max_t_lo, max_h, min_t_hi, min_t_lo, min_h]`.
    /// Temperature precedes humidity here, unlike sample groups.
    pub fn from_bytes(bytes: [u8; 6]) -> Self {
        let reading = |hi, lo, h| Reading {
            humidity: decode_humidity(h),
            temperature: decode_temperature([hi, lo]),
        };
        Self {
            max: reading(bytes[0], bytes[1], bytes[2]),
            min: reading(bytes[3], bytes[4], bytes[5]),
        }
    }
}

#[inline(always)]
pub fn decode_humidity(raw: u8) -> i16 {
    raw as i16 - 20
}

#[inline(always)]
pub fn decode_temperature(raw: [u8; 2]) -> f32 {
    (u16::from_be_bytes(raw) as i32 - 500) as f32 / 10.0
}

#[inline(always)]
pub fn celsius_to_fahrenheit(c: f32) -> f32 {
    c * 9.0 / 5.0 + 32.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_group() {
        let r = Reading::from_group([0x3c, 0x02, 0x14]);
        assert_eq!(r.humidity, 40);
        assert_eq!(r.temperature, 3.2);
    }

    #[test]
    fn negative_temperature() {
        // 0x0190 = 400 -> -10.0C
        let r = Reading::from_group([0x14, 0x01, 0x90]);
        assert_eq!(r.humidity, 0);
        assert_eq!(r.temperature, -10.0);
        assert_eq!(r.fahrenheit(), 14.0);
    }

    #[test]
    fn extremes_order() {
        let e = Extremes::from_bytes([0x02, 0xee, 0x64, 0x01, 0xf4, 0x1e]);
        assert_eq!(e.max.temperature, 25.0);
        assert_eq!(e.max.humidity, 80);
        assert_eq!(e.min.temperature, 0.0);
        assert_eq!(e.min.humidity, 10);
    }

    #[test]
    fn mode_bits() {
        assert_eq!(Mode::from_bits(0x2d), Ok(Mode::Cyclic));
        assert_eq!(Mode::from_bits(0x10), Ok(Mode::Segmented));
        assert_eq!(Mode::from_bits(0x1f), Err(ProtocolError::UnknownMode(0x18)));
    }

    #[test]
    fn serial_display() {
        assert_eq!(SerialId([0x0a, 0x1b, 0xc2, 0x00]).to_string(), "0A1BC200");
    }
}
