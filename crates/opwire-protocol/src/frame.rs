//! Frame codec: `[opcode: i32 LE, 4 bytes][payload: remaining bytes]`.
//!
//! One logical message occupies exactly one binary transport message, so
//! there is no length prefix and no checksum — the frame format only
//! multiplexes opcodes, it does not segment a byte stream.

use crate::ProtocolError;

/// Size of the opcode header in bytes.
pub const OPCODE_SIZE: usize = 4;

/// A parsed frame borrowing its payload from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Signed 32-bit message tag, read little-endian from the first 4 bytes.
    pub opcode: i32,
    /// Everything after the opcode. May be empty.
    pub payload: &'a [u8],
}

/// Parses a frame from raw bytes.
///
/// Returns `None` when `data` is too short to contain an opcode. The
/// payload is a zero-copy subslice of `data`.
pub fn parse(data: &[u8]) -> Option<Frame<'_>> {
    if data.len() < OPCODE_SIZE {
        return None;
    }
    let opcode = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    Some(Frame {
        opcode,
        payload: &data[OPCODE_SIZE..],
    })
}

/// Builds a frame into a newly allocated buffer.
pub fn build(opcode: i32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame_size(payload.len()));
    out.extend_from_slice(&opcode.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Builds a frame into a caller-supplied buffer.
///
/// Returns the number of bytes written.
///
/// # Errors
/// Returns [`ProtocolError::BufferTooSmall`] if `dst` is shorter than
/// `frame_size(payload.len())`.
pub fn build_into(
    dst: &mut [u8],
    opcode: i32,
    payload: &[u8],
) -> Result<usize, ProtocolError> {
    let required = frame_size(payload.len());
    if dst.len() < required {
        return Err(ProtocolError::BufferTooSmall {
            required,
            available: dst.len(),
        });
    }
    dst[..OPCODE_SIZE].copy_from_slice(&opcode.to_le_bytes());
    dst[OPCODE_SIZE..required].copy_from_slice(payload);
    Ok(required)
}

/// Total frame size for a payload of the given length.
pub fn frame_size(payload_len: usize) -> usize {
    OPCODE_SIZE + payload_len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_known_vector() {
        let frame = build(1, &[0x41, 0x42]);
        assert_eq!(frame, vec![0x01, 0x00, 0x00, 0x00, 0x41, 0x42]);
    }

    #[test]
    fn test_parse_known_vector() {
        let frame =
            parse(&[0x01, 0x00, 0x00, 0x00, 0x41, 0x42]).expect("valid frame");
        assert_eq!(frame.opcode, 1);
        assert_eq!(frame.payload, &[0x41, 0x42]);
    }

    #[test]
    fn test_parse_rejects_short_input() {
        // Every input shorter than the opcode header is invalid.
        assert!(parse(&[]).is_none());
        assert!(parse(&[0x01]).is_none());
        assert!(parse(&[0x01, 0x00]).is_none());
        assert!(parse(&[0x01, 0x00, 0x00]).is_none());
    }

    #[test]
    fn test_parse_opcode_only_frame() {
        let frame = parse(&[0x0A, 0x00, 0x00, 0x00]).expect("valid frame");
        assert_eq!(frame.opcode, 10);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_round_trip() {
        let cases: &[(i32, &[u8])] = &[
            (0, b""),
            (1, b"AB"),
            (-1, b"payload"),
            (i32::MAX, &[0xFF; 32]),
            (i32::MIN, b"\x00"),
        ];
        for &(opcode, payload) in cases {
            let bytes = build(opcode, payload);
            let frame = parse(&bytes).expect("round-trip frame");
            assert_eq!(frame.opcode, opcode);
            assert_eq!(frame.payload, payload);
        }
    }

    #[test]
    fn test_negative_opcode_little_endian() {
        let frame = build(-2, b"");
        assert_eq!(frame, vec![0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(parse(&frame).unwrap().opcode, -2);
    }

    #[test]
    fn test_build_into_exact_buffer() {
        let mut dst = [0u8; 6];
        let written = build_into(&mut dst, 1, &[0x41, 0x42]).unwrap();
        assert_eq!(written, 6);
        assert_eq!(dst, [0x01, 0x00, 0x00, 0x00, 0x41, 0x42]);
    }

    #[test]
    fn test_build_into_oversized_buffer_reports_written() {
        let mut dst = [0xAAu8; 10];
        let written = build_into(&mut dst, 2, &[0x01]).unwrap();
        assert_eq!(written, 5);
        assert_eq!(&dst[..5], &[0x02, 0x00, 0x00, 0x00, 0x01]);
        // Bytes past the frame are untouched.
        assert_eq!(&dst[5..], &[0xAA; 5]);
    }

    #[test]
    fn test_build_into_buffer_too_small() {
        let mut dst = [0u8; 5];
        let err = build_into(&mut dst, 1, &[0x41, 0x42]).unwrap_err();
        match err {
            ProtocolError::BufferTooSmall {
                required,
                available,
            } => {
                assert_eq!(required, 6);
                assert_eq!(available, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_frame_size() {
        assert_eq!(frame_size(0), 4);
        assert_eq!(frame_size(128), 132);
    }
}
