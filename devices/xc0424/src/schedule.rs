//! Segmented recording windows.
//!
//! The schedule region holds four slots of ten bytes, each a start and an end
//! stamp of `[yy, month, dd, hh, mm]`. Every field is packed decimal except
//! the month, which is stored as its raw value. That keeps the first slot's
//! month in the low nibble, and the high nibble of that byte carries the
//! presence bits (`0x10` for slot 1 through `0x80` for slot 4).

use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime, Timelike};
use xc_sync_core::{LoggerError, ProtocolError, Result};

use crate::abi::Arg;
use crate::bcd;

/// Memory address of the schedule region
pub const SCHEDULE_ADDRESS: u16 = 0x0018;
/// Length of the schedule region
pub const SCHEDULE_LEN: usize = 40;
/// Number of recording windows
pub const SLOT_COUNT: usize = 4;

const SLOT_LEN: usize = 10;
const STAMP_LEN: usize = 5;
/// Byte holding the presence bits, shared with slot 1's start month
const STATUS_BYTE: usize = 1;
const PRESENCE_MASK: u8 = 0xf0;

/// One recording window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ScheduleSlot {
    pub const FORMAT: &'static str = "%Y-%m-%dT%H:%M";
}

impl FromStr for ScheduleSlot {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (start, end) = s
            .split_once("..")
            .ok_or_else(|| format!("invalid slot {s}, expected START..END"))?;
        let parse = |t: &str| {
            NaiveDateTime::parse_from_str(t.trim(), Self::FORMAT)
                .map_err(|e| format!("invalid time {t}: {e} (expected YYYY-MM-DDTHH:MM)"))
        };
        let slot = Self {
            start: parse(start)?,
            end: parse(end)?,
        };
        if slot.end < slot.start {
            return Err(format!("slot {s} ends before it starts"));
        }
        Ok(slot)
    }
}

/// Encoded schedule region
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleBytes(pub [u8; SCHEDULE_LEN]);

impl Arg for ScheduleBytes {
    const SIZE: usize = SCHEDULE_LEN;
    #[inline(always)]
    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

/// Up to four recording windows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SegmentedSchedule {
    pub slots: [Option<ScheduleSlot>; SLOT_COUNT],
}

impl SegmentedSchedule {
    /// Build a schedule from the given windows, in slot order
    pub fn new(windows: &[ScheduleSlot]) -> Result<Self> {
        if windows.len() > SLOT_COUNT {
            return Err(LoggerError::out_of_range("schedule slots", windows.len()));
        }
        let mut slots = [None; SLOT_COUNT];
        for (slot, window) in slots.iter_mut().zip(windows) {
            *slot = Some(*window);
        }
        Ok(Self { slots })
    }

    /// Presence bitmask derived from which slots are set
    pub fn presence(&self) -> u8 {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .fold(0, |mask, (i, _)| mask | (0x10 << i))
    }

    /// Encode all four slots.
    ///
    /// The region has a fixed size, so empty slots are filled with `now` and
    /// left out of the presence bits.
    pub fn encode(&self, now: NaiveDateTime) -> Result<ScheduleBytes> {
        let mut buf = [0u8; SCHEDULE_LEN];
        for (chunk, slot) in buf.chunks_exact_mut(SLOT_LEN).zip(&self.slots) {
            let (start, end) = slot.map_or((now, now), |s| (s.start, s.end));
            chunk[..STAMP_LEN].copy_from_slice(&encode_stamp(start)?);
            chunk[STAMP_LEN..].copy_from_slice(&encode_stamp(end)?);
        }
        buf[STATUS_BYTE] |= self.presence();
        Ok(ScheduleBytes(buf))
    }

    /// Decode the schedule region. Slots without their presence bit are
    /// `None` whatever their bytes contain.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < SCHEDULE_LEN {
            return Err(ProtocolError::ShortRead {
                address: SCHEDULE_ADDRESS,
                expected: SCHEDULE_LEN,
                actual: payload.len(),
            }
            .into());
        }

        let presence = payload[STATUS_BYTE] & PRESENCE_MASK;
        let mut slots = [None; SLOT_COUNT];
        for (i, (slot, chunk)) in slots
            .iter_mut()
            .zip(payload[..SCHEDULE_LEN].chunks_exact(SLOT_LEN))
            .enumerate()
        {
            if presence & (0x10 << i) == 0 {
                continue;
            }
            let (mut start, mut end) = ([0u8; STAMP_LEN], [0u8; STAMP_LEN]);
            start.copy_from_slice(&chunk[..STAMP_LEN]);
            end.copy_from_slice(&chunk[STAMP_LEN..]);
            if i == 0 {
                start[STATUS_BYTE] &= !PRESENCE_MASK;
            }
            *slot = Some(ScheduleSlot {
                start: decode_stamp(start)?,
                end: decode_stamp(end)?,
            });
        }
        Ok(Self { slots })
    }
}

fn encode_stamp(time: NaiveDateTime) -> Result<[u8; STAMP_LEN]> {
    if !(2000..=2099).contains(&time.year()) {
        return Err(LoggerError::out_of_range("schedule year", time.year()));
    }
    Ok([
        bcd::encode((time.year() % 100) as u8)?,
        time.month() as u8,
        bcd::encode(time.day() as u8)?,
        bcd::encode(time.hour() as u8)?,
        bcd::encode(time.minute() as u8)?,
    ])
}

fn decode_stamp(raw: [u8; STAMP_LEN]) -> std::result::Result<NaiveDateTime, ProtocolError> {
    let [year, month, day, hour, minute] = raw;
    bcd::decode_datetime([year, month, day, hour, minute, 0x00])
}
