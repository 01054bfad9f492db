//! High level abstraction for interacting with XC0424 temperature/humidity loggers
//!
//! Every exchange is one blocking request/response pair over a [`Transport`],
//! so a [`Xc0424`] handle must be owned by a single thread or task.

use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::{debug, info};
use xc_sync_core::{DeviceInfo, LoggerError, ProtocolError, Result, Transport};

use bcd::PackedDecimal;
use config::{ConfigWrite, DeviceConfig, CONFIG_ADDRESS, CONFIG_LEN};
use hid::{HidOptions, HidTransport};
use history::{History, StorageLayout};
use schedule::{SegmentedSchedule, SCHEDULE_ADDRESS, SCHEDULE_LEN};
use types::{Extremes, Mode, Reading};

pub mod abi;
pub mod bcd;
pub mod config;
pub mod frame;
pub mod hid;
pub mod history;
#[cfg(test)]
mod mock;
pub mod schedule;
pub mod types;

pub mod consts {
    pub const VENDOR_ID: u16 = 0x10C4;
    pub const PRODUCT_ID: u16 = 0x8468;
    /// Fixed report size of the interrupt endpoints
    pub const FRAME_SIZE: usize = 64;

    /// Status read used to wake the device
    pub const WAKE_ADDRESS: u16 = 0x0002;
    pub const WAKE_LEN: u8 = 2;
    /// First status byte while the device is still waking up
    pub const ASLEEP: u8 = 0x55;
    /// Response byte for an accepted write
    pub const ACK: u8 = 0xAA;

    /// Highest and lowest readings since the last reset
    pub const EXTREMES_ADDRESS: u16 = 0x0050;
}

/// Static device info for detection
pub static INFO: DeviceInfo = DeviceInfo {
    name: "XC0424 Temperature/Humidity Logger",
    vendor_id: consts::VENDOR_ID,
    product_id: consts::PRODUCT_ID,
};

/// High level abstraction for managing an XC0424 logger
pub struct Xc0424<T = HidTransport> {
    transport: T,
    strict_checksum: bool,
}

impl Xc0424<HidTransport> {
    /// Find and open the device, then wake it up
    pub fn open_with(options: &HidOptions) -> Result<Self> {
        let mut this = Self::new(HidTransport::open(options)?);
        this.wake()?;
        Ok(this)
    }
}

impl<T: Transport> Xc0424<T> {
    /// Wrap an already opened transport
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            strict_checksum: false,
        }
    }

    /// Reject responses whose checksum does not match their payload
    pub fn with_strict_checksum(mut self, strict: bool) -> Self {
        self.strict_checksum = strict;
        self
    }

    /// Internal method to execute a payload and read the response payload
    fn execute(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        let size = self.transport.frame_size();
        let frame = frame::encode(payload, size)?;
        debug!("-> {payload:02x?}");
        self.transport.send(&frame)?;
        let raw = self.transport.receive(size)?;
        let response = frame::decode(&raw, self.strict_checksum)?;
        debug!("<- {response:02x?}");
        Ok(response)
    }

    /// Internal method for writes that must be acknowledged
    fn execute_acked(&mut self, payload: &[u8]) -> Result<()> {
        let res = self.execute(payload)?;
        (res.first() == Some(&consts::ACK))
            .then_some(())
            .ok_or(LoggerError::CommandFailed("device rejected command"))
    }

    /// Wake the device. A sleeping device answers the first status read
    /// with [`consts::ASLEEP`] and needs it repeated.
    pub fn wake(&mut self) -> Result<()> {
        let payload = abi::read_memory(consts::WAKE_ADDRESS, consts::WAKE_LEN);
        let res = self.execute(&payload)?;
        if res.first() == Some(&consts::ASLEEP) {
            debug!("device was asleep, repeating status read");
            self.execute(&payload)?;
        }
        Ok(())
    }

    /// Read `len` bytes of device memory
    pub fn read_memory(&mut self, address: u16, len: u8) -> Result<Vec<u8>> {
        let mut res = self.execute(&abi::read_memory(address, len))?;
        if res.len() < len as usize {
            return Err(ProtocolError::ShortRead {
                address,
                expected: len as usize,
                actual: res.len(),
            }
            .into());
        }
        res.truncate(len as usize);
        Ok(res)
    }

    /// Read and decode the device configuration
    pub fn read_config(&mut self) -> Result<DeviceConfig> {
        let block = self.read_memory(CONFIG_ADDRESS, CONFIG_LEN as u8)?;
        DeviceConfig::decode(&block)
    }

    /// Read the segmented recording windows
    pub fn read_schedule(&mut self) -> Result<SegmentedSchedule> {
        let block = self.read_memory(SCHEDULE_ADDRESS, SCHEDULE_LEN as u8)?;
        SegmentedSchedule::decode(&block)
    }

    /// Read the live humidity and temperature
    pub fn read_current(&mut self) -> Result<Reading> {
        let res = self.execute(&abi::read_current())?;
        let group: [u8; 3] = res
            .get(..3)
            .and_then(|g| g.try_into().ok())
            .ok_or(ProtocolError::Truncated {
                declared: 3,
                actual: res.len(),
            })?;
        Ok(Reading::from_group(group))
    }

    /// Read the highest and lowest recorded values
    pub fn read_extremes(&mut self) -> Result<Extremes> {
        let res = self.read_memory(consts::EXTREMES_ADDRESS, Extremes::LEN as u8)?;
        let mut bytes = [0u8; Extremes::LEN];
        bytes.copy_from_slice(&res);
        Ok(Extremes::from_bytes(bytes))
    }

    /// Set the device clock. The device stores a two digit year.
    pub fn set_clock(&mut self, time: NaiveDateTime) -> Result<()> {
        if !(2000..=2099).contains(&time.year()) {
            return Err(LoggerError::out_of_range("clock year", time.year()));
        }
        let p = |v: u32| PackedDecimal::new(v as u8);
        self.execute(&abi::set_clock(
            p(time.year() as u32 % 100)?,
            p(time.month())?,
            p(time.day())?,
            p(time.hour())?,
            p(time.minute())?,
            p(time.second())?,
        ))?;
        info!("clock set to {time}");
        Ok(())
    }

    /// Write a configuration. Fields are merged into the register byte the
    /// config was read with, so bits the codec does not know about survive.
    pub fn write_config(&mut self, config: &DeviceConfig) -> Result<ConfigWrite> {
        let write = config.encode();
        self.execute_acked(&write.payload())?;
        info!(
            "configuration written, register {:#04x}, interval {}s",
            write.register.bits(),
            write.interval
        );
        Ok(write)
    }

    /// Write the segmented recording windows, filling empty slots with `now`
    pub fn write_schedule(&mut self, schedule: &SegmentedSchedule, now: NaiveDateTime) -> Result<()> {
        let bytes = schedule.encode(now)?;
        self.execute(&abi::write_schedule(bytes))?;
        info!("schedule written, presence {:#04x}", schedule.presence());
        Ok(())
    }

    /// Erase all stored history
    pub fn clear_history(&mut self) -> Result<()> {
        self.execute(&abi::clear_history())?;
        info!("history cleared");
        Ok(())
    }

    /// Sync the clock and write `config`. When the new mode is segmented the
    /// schedule is written (all slots absent when none is given) and history
    /// is cleared so the log restarts under the new windows.
    pub fn apply(
        &mut self,
        config: &DeviceConfig,
        schedule: Option<&SegmentedSchedule>,
        now: NaiveDateTime,
    ) -> Result<ConfigWrite> {
        self.set_clock(now)?;
        let write = self.write_config(config)?;
        if config.mode == Mode::Segmented {
            self.write_schedule(&schedule.copied().unwrap_or_default(), now)?;
            self.clear_history()?;
        }
        Ok(write)
    }

    /// Stream every stored sample, oldest block first
    pub fn history(&mut self) -> History<'_, T> {
        History::new(self, StorageLayout::XC0424)
    }

    /// Stream stored samples using a custom storage layout
    pub fn history_with_layout(&mut self, layout: StorageLayout) -> History<'_, T> {
        History::new(self, layout)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::mock::FakeLogger;
    use crate::schedule::ScheduleSlot;
    use crate::types::{DateFormat, TemperatureUnit, TimeFormat};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 5, 15)
            .unwrap()
            .and_hms_opt(12, 34, 56)
            .unwrap()
    }

    fn configured() -> FakeLogger {
        let mut fake = FakeLogger::new();
        fake.memory[0x0005..0x000f]
            .copy_from_slice(&[0xde, 0xad, 0xbe, 0xef, 0xc9, 0x00, 0x3c, 0x00, 0x64, 0x14]);
        fake
    }

    #[test]
    fn wake_repeats_when_asleep() {
        let mut fake = FakeLogger::new();
        fake.asleep = true;
        let mut device = Xc0424::new(&mut fake);
        device.wake().unwrap();
        assert_eq!(fake.sent, vec![vec![0x01, 0x00, 0x00, 0x02, 0x02]; 2]);
    }

    #[test]
    fn wake_once_when_awake() {
        let mut fake = FakeLogger::new();
        Xc0424::new(&mut fake).wake().unwrap();
        assert_eq!(fake.sent.len(), 1);
    }

    #[test]
    fn read_config() {
        let mut fake = configured();
        let config = Xc0424::new(&mut fake).read_config().unwrap();
        assert_eq!(config.serial_id.to_string(), "DEADBEEF");
        assert_eq!(config.mode, Mode::Cyclic);
        assert_eq!(config.sample_interval, 60);
        assert_eq!(config.temperature_offset, 0.0);
        assert_eq!(config.humidity_offset, 0);
        assert_eq!(fake.sent, [[0x01, 0x00, 0x00, 0x05, 0x0a]]);
    }

    #[test]
    fn current_and_extremes() {
        let mut fake = FakeLogger::new();
        fake.current = [0x3c, 0x02, 0x14];
        fake.memory[0x0050..0x0056].copy_from_slice(&[0x02, 0xee, 0x64, 0x01, 0xf4, 0x1e]);
        let mut device = Xc0424::new(&mut fake);
        let current = device.read_current().unwrap();
        assert_eq!(current.humidity, 40);
        assert_eq!(current.temperature, 3.2);
        let extremes = device.read_extremes().unwrap();
        assert_eq!(extremes.max.temperature, 25.0);
        assert_eq!(extremes.min.humidity, 10);
    }

    #[test]
    fn short_read_is_an_error() {
        let mut fake = FakeLogger::new();
        fake.truncate_reads = Some(4);
        let err = Xc0424::new(&mut fake).read_config().unwrap_err();
        assert!(matches!(
            err,
            LoggerError::Protocol(ProtocolError::ShortRead {
                address: 0x0005,
                expected: 10,
                actual: 4
            })
        ));
    }

    #[test]
    fn strict_checksum() {
        let mut fake = configured();
        fake.corrupt_checksums = true;
        assert!(Xc0424::new(&mut fake).read_config().is_ok());
        let err = Xc0424::new(&mut fake)
            .with_strict_checksum(true)
            .read_config()
            .unwrap_err();
        assert!(matches!(
            err,
            LoggerError::Protocol(ProtocolError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn write_config_merges_register() {
        let mut fake = configured();
        let mut device = Xc0424::new(&mut fake);
        let mut config = device.read_config().unwrap();
        config.mode = Mode::Acyclic;
        config.time_format = TimeFormat::H12;
        config.date_format = DateFormat::MonthDay;
        config.temperature_unit = TemperatureUnit::Fahrenheit;
        config.lcd_auto_off = false;
        config.sample_interval = 100;
        let write = device.write_config(&config).unwrap();

        // 0xc0 bits are unknown to the codec and must survive
        assert_eq!(write.register.bits(), 0xc2);
        assert_eq!(write.interval, 120);
        assert_eq!(
            fake.sent.last().unwrap(),
            &[0x00, 0x22, 0xc2, 0x00, 0x78, 0x00, 0x64, 0x14]
        );
        assert_eq!(fake.memory[0x0009], 0xc2);
    }

    #[test]
    fn rejected_write() {
        let mut fake = configured();
        fake.reject_writes = true;
        let mut device = Xc0424::new(&mut fake);
        let config = device.read_config().unwrap();
        assert!(matches!(
            device.write_config(&config),
            Err(LoggerError::CommandFailed(_))
        ));
    }

    #[test]
    fn apply_segmented() {
        let mut fake = configured();
        let mut device = Xc0424::new(&mut fake);
        let mut config = device.read_config().unwrap();
        config.mode = Mode::Segmented;
        let slot: ScheduleSlot = "2023-05-18T00:00..2023-05-18T01:00".parse().unwrap();
        let schedule = SegmentedSchedule::new(&[slot]).unwrap();
        device.apply(&config, Some(&schedule), now()).unwrap();

        let opcodes: Vec<_> = fake.sent.iter().map(|p| [p[0], p[1]]).collect();
        assert_eq!(
            opcodes,
            [
                [0x01, 0x00], // config read for the user
                [0x00, 0x11], // clock
                [0x00, 0x22], // config
                [0x00, 0x04], // schedule
                [0x00, 0x08], // clear
            ]
        );
        assert_eq!(fake.sent[1], [0x00, 0x11, 0x23, 0x05, 0x15, 0x12, 0x34, 0x56]);

        let mut device = Xc0424::new(&mut fake);
        assert_eq!(device.read_schedule().unwrap(), schedule);
        assert_eq!(device.read_config().unwrap().mode, Mode::Segmented);
    }

    #[test]
    fn apply_cyclic_skips_schedule() {
        let mut fake = configured();
        let mut device = Xc0424::new(&mut fake);
        let config = device.read_config().unwrap();
        device
            .apply(&config, Some(&SegmentedSchedule::default()), now())
            .unwrap();
        let opcodes: Vec<_> = fake.sent.iter().map(|p| [p[0], p[1]]).collect();
        assert_eq!(opcodes, [[0x01, 0x00], [0x00, 0x11], [0x00, 0x22]]);
    }

    #[test]
    fn apply_segmented_without_slots() {
        let mut fake = configured();
        let mut device = Xc0424::new(&mut fake);
        let mut config = device.read_config().unwrap();
        config.mode = Mode::Segmented;
        device.apply(&config, None, now()).unwrap();

        let opcodes: Vec<_> = fake.sent.iter().map(|p| [p[0], p[1]]).collect();
        assert_eq!(
            opcodes,
            [
                [0x01, 0x00],
                [0x00, 0x11],
                [0x00, 0x22],
                [0x00, 0x04],
                [0x00, 0x08],
            ]
        );
        // placeholder slots are written with no presence bits
        assert_eq!(fake.sent[3][2 + 1] & 0xf0, 0x00);
        let mut device = Xc0424::new(&mut fake);
        assert_eq!(device.read_schedule().unwrap(), SegmentedSchedule::default());
    }

    #[test]
    fn clock_year_out_of_range() {
        let mut fake = FakeLogger::new();
        let time = NaiveDate::from_ymd_opt(1999, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert!(Xc0424::new(&mut fake).set_clock(time).is_err());
        assert!(fake.sent.is_empty());
    }
}
