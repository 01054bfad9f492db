//! hidapi backed [`Transport`].

use std::time::Duration;

use hidapi::{HidApi, HidDevice};
use tracing::debug;
use xc_sync_core::{DeviceInfo, LoggerError, Result, Transport};

use crate::{consts, INFO};

/// How to find and talk to the device
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HidOptions {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Size of every report, marker byte included
    pub frame_size: usize,
    /// How long to wait for each response
    pub timeout: Duration,
}

impl Default for HidOptions {
    fn default() -> Self {
        Self {
            vendor_id: consts::VENDOR_ID,
            product_id: consts::PRODUCT_ID,
            frame_size: consts::FRAME_SIZE,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Exclusive handle to one logger over HID
pub struct HidTransport {
    pub device: HidDevice,
    frame_size: usize,
    timeout: Duration,
}

impl HidTransport {
    /// Find and open the first device matching `options`
    pub fn open(options: &HidOptions) -> Result<Self> {
        let model = DeviceInfo {
            vendor_id: options.vendor_id,
            product_id: options.product_id,
            ..INFO
        };
        let api = HidApi::new()?;
        let info = api
            .device_list()
            .find(|d| model.matches(d.vendor_id(), d.product_id()))
            .ok_or(LoggerError::DeviceNotFound)?;
        debug!(
            path = ?info.path(),
            "opening {} at {:04x}:{:04x}",
            model.name,
            model.vendor_id,
            model.product_id
        );

        Ok(Self {
            device: info.open_device(&api)?,
            frame_size: options.frame_size,
            timeout: options.timeout,
        })
    }
}

impl Transport for HidTransport {
    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.device.write(frame)?;
        Ok(())
    }

    fn receive(&mut self, max_size: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_size];
        let timeout = self.timeout.as_millis().min(i32::MAX as u128) as i32;
        let len = self.device.read_timeout(&mut buf, timeout)?;
        if len == 0 {
            return Err(LoggerError::Timeout);
        }
        buf.truncate(len);
        Ok(buf)
    }
}
