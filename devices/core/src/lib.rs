//! Core traits and types for xc-sync logger abstraction.
//!
//! This crate provides:
//! - The `Transport` trait every device crate speaks its protocol over
//! - Shared error types (`LoggerError`, `ProtocolError`)
//! - Static device identification (`DeviceInfo`)

mod device;
mod error;
mod transport;

pub use device::DeviceInfo;
pub use error::{LoggerError, ProtocolError, Result};
pub use transport::Transport;
