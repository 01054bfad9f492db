//! Error types shared by every logger crate.
//!
//! Frame and field level decode failures surface as [`ProtocolError`]. Any
//! failure of the underlying channel is a [`LoggerError::Hid`] or
//! [`LoggerError::Timeout`] and aborts the in-flight operation; nothing in
//! this workspace retries a request.

/// Errors raised while encoding or decoding the wire protocol
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Response did not start with the frame marker
    #[error("bad frame marker: expected 0x02, got {0:#04x}")]
    BadMarker(u8),

    /// Response was shorter than its own length field claims
    #[error("truncated frame: declared {declared} bytes, received {actual}")]
    Truncated { declared: usize, actual: usize },

    /// Configuration register holds a mode the device does not document
    #[error("unknown logging mode bits {0:#04x}")]
    UnknownMode(u8),

    /// Response checksum did not match its payload (strict mode only)
    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// Payload cannot be represented by the one byte length field
    #[error("payload of {0} bytes does not fit in a frame")]
    PayloadTooLarge(usize),

    /// Encoded frame exceeds the transport's fixed frame size
    #[error("frame of {len} bytes exceeds the {max} byte frame size")]
    FrameOverflow { len: usize, max: usize },

    /// Memory read returned fewer bytes than requested
    #[error("short read at {address:#06x}: expected {expected} bytes, got {actual}")]
    ShortRead {
        address: u16,
        expected: usize,
        actual: usize,
    },

    /// Packed-decimal fields did not form a valid civil datetime
    #[error("invalid timestamp bytes {0:02x?}")]
    InvalidTimestamp(Vec<u8>),

    /// Storage index entry claims more groups than a block can hold
    #[error("index entry {index} holds {value:#04x}, more groups than a block can hold")]
    GroupCountOutOfRange { index: usize, value: u8 },
}

/// Errors that can occur during logger operations
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Device was not found
    #[error("device not found")]
    DeviceNotFound,

    /// Command was rejected by the device
    #[error("command failed: {0}")]
    CommandFailed(&'static str),

    /// Malformed frame or field
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Field value outside the range the device accepts
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    /// Device did not answer within the transport timeout
    #[error("timed out waiting for a response")]
    Timeout,

    /// HID communication error
    #[error("hid error: {0}")]
    Hid(#[from] hidapi::HidError),
}

impl LoggerError {
    /// Shorthand for building an [`LoggerError::OutOfRange`]
    pub fn out_of_range(field: &'static str, value: impl std::fmt::Display) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoggerError>;
