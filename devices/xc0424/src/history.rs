//! Stored history download.
//!
//! Storage is split into three regions walked in lockstep, one index slot at
//! a time:
//!
//! - the index (map) region holds one byte per block: `0xFF` for an empty
//!   block, otherwise the number of stored sample groups minus one
//! - the header region holds an 8 byte [`BlockHeader`] per block
//! - the data region holds room for 64 three byte sample groups per block
//!
//! All three cursors advance for every index slot, empty or not. A scan is a
//! single forward pass and the first failed request ends it, since the
//! cursors cannot be resynchronised mid scan.

use chrono::{NaiveDateTime, TimeDelta};
use tracing::{debug, trace};
use xc_sync_core::{LoggerError, ProtocolError, Result, Transport};

use crate::bcd;
use crate::types::Reading;
use crate::Xc0424;

/// Index byte marking an empty block
pub const EMPTY: u8 = 0xff;
/// Bytes per sample group
pub const GROUP_LEN: usize = 3;
/// Sample groups a block can hold
pub const BLOCK_GROUPS: usize = 0x40;

/// Fixed addresses and strides of the storage regions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorageLayout {
    /// First index byte
    pub map_start: u32,
    /// End of the index region (exclusive)
    pub map_end: u32,
    /// Index bytes fetched per read
    pub map_chunk: u8,
    /// First block header
    pub header_start: u32,
    pub header_stride: u32,
    /// First block's sample groups
    pub data_start: u32,
    pub data_stride: u32,
    /// Largest sample read, a whole number of groups
    pub data_chunk: u8,
}

impl StorageLayout {
    pub const XC0424: Self = Self {
        map_start: 0x0058,
        map_end: 0x019c,
        map_chunk: 0x1b,
        header_start: 0x019c,
        header_stride: BlockHeader::LEN as u32,
        data_start: 0x0d00,
        data_stride: (BLOCK_GROUPS * GROUP_LEN) as u32,
        data_chunk: 0x27,
    };
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::XC0424
    }
}

/// A non-empty index slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapEntry {
    /// Slot number counted from the start of the index region
    pub index: usize,
    /// Stored sample groups, `1..=64`
    pub group_count: usize,
}

impl MapEntry {
    /// Interpret one index byte. Empty slots are `None`.
    pub fn from_raw(index: usize, raw: u8) -> std::result::Result<Option<Self>, ProtocolError> {
        match raw {
            EMPTY => Ok(None),
            raw if raw as usize >= BLOCK_GROUPS => {
                Err(ProtocolError::GroupCountOutOfRange { index, value: raw })
            },
            raw => Ok(Some(Self {
                index,
                group_count: raw as usize + 1,
            })),
        }
    }

    /// Sizes of the sample reads needed for this block: as many full
    /// `chunk` reads as fit, then one read for the remainder.
    pub fn read_sizes(&self, chunk: u8) -> impl Iterator<Item = u8> {
        let total = self.group_count * GROUP_LEN;
        let chunk = chunk as usize;
        let remainder = total % chunk;
        std::iter::repeat_n(chunk as u8, total / chunk)
            .chain((remainder > 0).then_some(remainder as u8))
    }
}

/// Start time and sample interval of one block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub start_time: NaiveDateTime,
    /// Seconds between samples
    pub interval: u16,
}

impl BlockHeader {
    pub const LEN: usize = 8;

    /// Decode `[yy, mm, dd, hh, mm, ss, interval_hi, interval_lo]`
    pub fn decode(raw: &[u8]) -> std::result::Result<Self, ProtocolError> {
        let raw: &[u8; Self::LEN] = raw.try_into().map_err(|_| ProtocolError::Truncated {
            declared: Self::LEN,
            actual: raw.len(),
        })?;
        let [y, mo, d, h, mi, s, hi, lo] = *raw;
        Ok(Self {
            start_time: bcd::decode_datetime([y, mo, d, h, mi, s])?,
            interval: u16::from_be_bytes([hi, lo]),
        })
    }
}

/// One stored sample
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleRecord {
    pub timestamp: NaiveDateTime,
    /// Relative humidity in percent
    pub humidity: i16,
    /// Temperature in celsius
    pub temperature: f32,
}

impl SampleRecord {
    pub fn fahrenheit(&self) -> f32 {
        crate::types::celsius_to_fahrenheit(self.temperature)
    }
}

/// Lazily decodes a chunk of sample groups, stamping each one `interval`
/// seconds after the previous. A trailing partial group is ignored.
#[derive(Clone, Debug)]
pub struct Samples {
    chunk: Vec<u8>,
    pos: usize,
    timestamp: NaiveDateTime,
    interval: TimeDelta,
}

impl Samples {
    pub fn new(chunk: Vec<u8>, timestamp: NaiveDateTime, interval: u16) -> Self {
        Self {
            chunk,
            pos: 0,
            timestamp,
            interval: TimeDelta::seconds(interval as i64),
        }
    }

    /// Timestamp of the next group, which seeds the following chunk of the
    /// same block once this one is exhausted
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

impl Iterator for Samples {
    type Item = SampleRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let group: [u8; GROUP_LEN] = self
            .chunk
            .get(self.pos..self.pos + GROUP_LEN)?
            .try_into()
            .ok()?;
        self.pos += GROUP_LEN;

        let reading = Reading::from_group(group);
        let record = SampleRecord {
            timestamp: self.timestamp,
            humidity: reading.humidity,
            temperature: reading.temperature,
        };
        self.timestamp += self.interval;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.chunk.len().saturating_sub(self.pos) / GROUP_LEN;
        (n, Some(n))
    }
}

/// Block currently being read
#[derive(Debug)]
struct Block {
    address: u32,
    /// Sizes of the sample reads still to issue
    reads: std::vec::IntoIter<u8>,
    timestamp: NaiveDateTime,
    interval: u16,
}

/// A single forward scan over stored history.
///
/// Yields records in storage order. On the first error the error is yielded
/// once and the scan ends; records already yielded stay valid.
pub struct History<'a, T: Transport> {
    device: &'a mut Xc0424<T>,
    layout: StorageLayout,
    map_cursor: u32,
    date_cursor: u32,
    data_cursor: u32,
    map: Vec<u8>,
    map_pos: usize,
    index: usize,
    block: Option<Block>,
    samples: Option<Samples>,
    done: bool,
}

impl<'a, T: Transport> History<'a, T> {
    pub fn new(device: &'a mut Xc0424<T>, layout: StorageLayout) -> Self {
        Self {
            device,
            layout,
            map_cursor: layout.map_start,
            date_cursor: layout.header_start,
            data_cursor: layout.data_start,
            map: Vec::new(),
            map_pos: 0,
            index: 0,
            block: None,
            samples: None,
            done: false,
        }
    }

    fn read(&mut self, address: u32, len: u8) -> Result<Vec<u8>> {
        let address = u16::try_from(address)
            .map_err(|_| LoggerError::out_of_range("address", format!("{address:#x}")))?;
        self.device.read_memory(address, len)
    }

    /// Issue the next request of the scan. Returns `false` once the index
    /// region is exhausted.
    fn step(&mut self) -> Result<bool> {
        if let Some(block) = self.block.as_mut() {
            if let Some(len) = block.reads.next() {
                let (address, timestamp, interval) = (block.address, block.timestamp, block.interval);
                block.address += len as u32;
                let chunk = self.read(address, len)?;
                trace!("read {len} sample bytes at {address:#06x}");
                self.samples = Some(Samples::new(chunk, timestamp, interval));
                return Ok(true);
            }
            self.block = None;
        }

        if self.map_pos >= self.map.len() {
            if self.map_cursor >= self.layout.map_end {
                return Ok(false);
            }
            self.map = self.read(self.map_cursor, self.layout.map_chunk)?;
            self.map_cursor += self.layout.map_chunk as u32;
            self.map_pos = 0;
        }

        let raw = self.map[self.map_pos];
        let (index, header_address, data_address) = (self.index, self.date_cursor, self.data_cursor);
        self.map_pos += 1;
        self.index += 1;
        self.date_cursor += self.layout.header_stride;
        self.data_cursor += self.layout.data_stride;

        if let Some(entry) = MapEntry::from_raw(index, raw)? {
            let header = BlockHeader::decode(&self.read(header_address, BlockHeader::LEN as u8)?)?;
            debug!(
                "block {index}: {} groups from {} every {}s",
                entry.group_count, header.start_time, header.interval
            );
            self.block = Some(Block {
                address: data_address,
                reads: entry
                    .read_sizes(self.layout.data_chunk)
                    .collect::<Vec<_>>()
                    .into_iter(),
                timestamp: header.start_time,
                interval: header.interval,
            });
        }
        Ok(true)
    }
}

impl<T: Transport> Iterator for History<'_, T> {
    type Item = Result<SampleRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if let Some(samples) = self.samples.as_mut() {
                if let Some(record) = samples.next() {
                    return Some(Ok(record));
                }
                if let Some(block) = self.block.as_mut() {
                    block.timestamp = samples.timestamp();
                }
                self.samples = None;
            }
            match self.step() {
                Ok(true) => {},
                Ok(false) => self.done = true,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                },
            }
        }
    }
}

impl<T: Transport> std::iter::FusedIterator for History<'_, T> {}
