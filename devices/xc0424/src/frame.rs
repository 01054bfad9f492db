//! Command/response frame envelope.
//!
//! ```text
//! [0x02][N][payload (N-1 bytes)][checksum][zero padding to frame size]
//! ```
//!
//! `N` counts the payload plus the checksum byte, and the checksum is the
//! payload's byte sum modulo 256. Requests and responses share the envelope.

use xc_sync_core::ProtocolError;

/// First byte of every frame
pub const MARKER: u8 = 0x02;

/// Marker, length and checksum bytes around the payload
pub const OVERHEAD: usize = 3;

/// Checksum of a payload: byte sum modulo 256
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Wrap a payload into a frame padded with zeroes up to `frame_size`
pub fn encode(payload: &[u8], frame_size: usize) -> Result<Vec<u8>, ProtocolError> {
    let body_len = payload.len() + 1;
    if body_len > u8::MAX as usize {
        return Err(ProtocolError::PayloadTooLarge(payload.len()));
    }
    let len = payload.len() + OVERHEAD;
    if len > frame_size {
        return Err(ProtocolError::FrameOverflow {
            len,
            max: frame_size,
        });
    }

    let mut frame = Vec::with_capacity(frame_size);
    frame.push(MARKER);
    frame.push(body_len as u8);
    frame.extend_from_slice(payload);
    frame.push(checksum(payload));
    frame.resize(frame_size, 0);
    Ok(frame)
}

/// Strip the envelope from a response frame, returning only the payload.
///
/// The device's checksum is only compared when `verify` is set; the lenient
/// default matches how the device is driven by its vendor tooling.
pub fn decode(raw: &[u8], verify: bool) -> Result<Vec<u8>, ProtocolError> {
    let marker = *raw.first().ok_or(ProtocolError::Truncated {
        declared: 0,
        actual: 0,
    })?;
    if marker != MARKER {
        return Err(ProtocolError::BadMarker(marker));
    }

    let declared = *raw.get(1).ok_or(ProtocolError::Truncated {
        declared: 0,
        actual: raw.len(),
    })? as usize;
    if declared == 0 || raw.len() < declared + 2 {
        return Err(ProtocolError::Truncated {
            declared,
            actual: raw.len(),
        });
    }

    let payload = &raw[2..declared + 1];
    if verify {
        let expected = checksum(payload);
        let actual = raw[declared + 1];
        if expected != actual {
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }
    }
    Ok(payload.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_read_request() {
        let frame = encode(&[0x01, 0x00, 0x00, 0x05, 0x0a], 16).unwrap();
        assert_eq!(
            frame,
            [0x02, 0x06, 0x01, 0x00, 0x00, 0x05, 0x0a, 0x10, 0, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn checksum_position() {
        let payload = [0xff, 0xff, 0x03];
        let frame = encode(&payload, 64).unwrap();
        assert_eq!(frame.len(), 64);
        assert_eq!(frame[payload.len() + 2], 0x01);
    }

    #[test]
    fn roundtrip() {
        for len in [0usize, 1, 5, 39, 42, 253] {
            let payload: Vec<u8> = (0..len).map(|i| (i * 7) as u8).collect();
            let frame = encode(&payload, 256).unwrap();
            assert_eq!(decode(&frame, true).unwrap(), payload, "len {len}");
        }
    }

    #[test]
    fn payload_too_large() {
        assert_eq!(
            encode(&[0u8; 255], 512),
            Err(ProtocolError::PayloadTooLarge(255))
        );
        assert!(encode(&[0u8; 254], 512).is_ok());
    }

    #[test]
    fn frame_overflow() {
        assert_eq!(
            encode(&[0u8; 62], 64),
            Err(ProtocolError::FrameOverflow { len: 65, max: 64 })
        );
    }

    #[test]
    fn bad_marker() {
        assert_eq!(
            decode(&[0x03, 0x02, 0xaa, 0xaa], false),
            Err(ProtocolError::BadMarker(0x03))
        );
    }

    #[test]
    fn truncated() {
        assert_eq!(
            decode(&[0x02, 0x05, 0x01, 0x02], false),
            Err(ProtocolError::Truncated {
                declared: 5,
                actual: 4
            })
        );
        assert!(decode(&[], false).is_err());
        assert!(decode(&[0x02], false).is_err());
    }

    #[test]
    fn checksum_is_lenient_by_default() {
        let raw = [0x02, 0x02, 0xaa, 0x00, 0, 0];
        assert_eq!(decode(&raw, false).unwrap(), [0xaa]);
        assert_eq!(
            decode(&raw, true),
            Err(ProtocolError::ChecksumMismatch {
                expected: 0xaa,
                actual: 0x00
            })
        );
    }
}
