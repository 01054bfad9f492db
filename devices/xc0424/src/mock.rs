//! In-memory device used by tests.

use xc_sync_core::{LoggerError, Result, Transport};

use crate::config::CONFIG_ADDRESS;
use crate::consts::{ACK, ASLEEP, FRAME_SIZE, WAKE_ADDRESS};
use crate::frame;
use crate::schedule::{SCHEDULE_ADDRESS, SCHEDULE_LEN};

/// Answers requests from a flat memory image and records every payload sent
pub struct FakeLogger {
    pub memory: Vec<u8>,
    pub current: [u8; 3],
    /// Every request payload, in order
    pub sent: Vec<Vec<u8>>,
    /// Answer the next status read with [`ASLEEP`]
    pub asleep: bool,
    /// Cut memory reads down to this many bytes
    pub truncate_reads: Option<usize>,
    /// Send responses with a wrong checksum byte
    pub corrupt_checksums: bool,
    /// Answer writes with something other than [`ACK`]
    pub reject_writes: bool,
    /// Fail the transport once this many requests were sent
    pub fail_after: Option<usize>,
    pending: Option<Vec<u8>>,
}

impl FakeLogger {
    pub fn new() -> Self {
        Self {
            memory: vec![0xff; 0x10000],
            current: [0; 3],
            sent: Vec::new(),
            asleep: false,
            truncate_reads: None,
            corrupt_checksums: false,
            reject_writes: false,
            fail_after: None,
            pending: None,
        }
    }

    /// Memory reads as `(address, len)`, in order
    pub fn reads(&self) -> Vec<(u16, u8)> {
        self.sent
            .iter()
            .filter(|p| p.len() == 5 && p[..2] == [0x01, 0x00])
            .map(|p| (u16::from_be_bytes([p[2], p[3]]), p[4]))
            .collect()
    }

    fn respond(&mut self, payload: &[u8]) -> Vec<u8> {
        let ack = if self.reject_writes { 0x00 } else { ACK };
        match payload {
            [0x01, 0x00, hi, lo, len] => {
                let address = u16::from_be_bytes([*hi, *lo]) as usize;
                if address == WAKE_ADDRESS as usize && std::mem::take(&mut self.asleep) {
                    return vec![ASLEEP, 0x00];
                }
                let mut data = self.memory[address..address + *len as usize].to_vec();
                if let Some(max) = self.truncate_reads {
                    data.truncate(max);
                }
                data
            },
            [0x01, 0x01, 0x02] => self.current.to_vec(),
            [0x00, 0x22, register, rest @ ..] => {
                if !self.reject_writes {
                    let start = CONFIG_ADDRESS as usize + 4;
                    self.memory[start] = *register;
                    self.memory[start + 1..start + 1 + rest.len()].copy_from_slice(rest);
                }
                vec![ack]
            },
            [0x00, 0x04, slots @ ..] => {
                let start = SCHEDULE_ADDRESS as usize;
                self.memory[start..start + SCHEDULE_LEN].copy_from_slice(slots);
                vec![ack]
            },
            [0x00, 0x08] => {
                self.memory[0x0058..0x019c].fill(0xff);
                vec![ack]
            },
            _ => vec![ack],
        }
    }
}

impl Transport for FakeLogger {
    fn frame_size(&self) -> usize {
        FRAME_SIZE
    }

    fn send(&mut self, frame: &[u8]) -> Result<()> {
        if self.fail_after.is_some_and(|n| self.sent.len() >= n) {
            return Err(LoggerError::Timeout);
        }
        let payload = frame::decode(frame, true)?;
        let response = self.respond(&payload);
        self.sent.push(payload);
        self.pending = Some(response);
        Ok(())
    }

    fn receive(&mut self, max_size: usize) -> Result<Vec<u8>> {
        let response = self.pending.take().ok_or(LoggerError::Timeout)?;
        let mut raw = frame::encode(&response, max_size)?;
        if self.corrupt_checksums {
            raw[response.len() + 2] ^= 0xff;
        }
        Ok(raw)
    }
}
