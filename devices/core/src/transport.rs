//! Byte channel contract between the protocol code and the USB stack.

use crate::Result;

/// A single bidirectional, blocking, request/response byte channel.
///
/// Implementations own the device exclusively. Callers never interleave
/// requests: every `send` is followed by exactly one `receive` before the
/// next `send`. Timeouts belong to the implementation and surface as
/// [`LoggerError::Timeout`](crate::LoggerError::Timeout).
pub trait Transport {
    /// Fixed size of every frame written to and read from the channel
    fn frame_size(&self) -> usize;

    /// Write one complete, padded frame
    fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// Read one frame of at most `max_size` bytes
    fn receive(&mut self, max_size: usize) -> Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn frame_size(&self) -> usize {
        (**self).frame_size()
    }

    fn send(&mut self, frame: &[u8]) -> Result<()> {
        (**self).send(frame)
    }

    fn receive(&mut self, max_size: usize) -> Result<Vec<u8>> {
        (**self).receive(max_size)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn frame_size(&self) -> usize {
        (**self).frame_size()
    }

    fn send(&mut self, frame: &[u8]) -> Result<()> {
        (**self).send(frame)
    }

    fn receive(&mut self, max_size: usize) -> Result<Vec<u8>> {
        (**self).receive(max_size)
    }
}
