//! Varint encoding helpers for compact u64 length prefixes.
//!
//! Base-128 scheme: 7-bit chunks least-significant first, MSB set on every
//! byte except the last. Values are read front-to-back (the surrounding blob
//! is un-reversed before decoding starts).

use super::DynBuf;

/// Encode an unsigned 64-bit integer into `buf`.
///
/// - Value 0 encodes to a single byte `0x00`.
/// - Value 300 encodes to `[0xAC, 0x02]`.
///
/// Returns the number of bytes written.
pub fn encode_u64(mut value: u64, buf: &mut DynBuf) -> usize {
    let mut size = 0;
    loop {
        let chunk = (value & 0x7F) as u8;
        value >>= 7;
        size += 1;
        if value > 0 {
            buf.push(chunk | 0x80);
        } else {
            buf.push(chunk);
            break size;
        }
    }
}

/// Decode one unsigned 64-bit integer from the front of the given slice.
///
/// On success returns `Some(value)` and advances `buf` past the consumed
/// bytes. Returns `None` if the slice ends before a terminating byte
/// (MSB = 0) is found, or if the value would not fit into 64 bits.
pub fn decode_u64(buf: &mut &[u8]) -> Option<u64> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let (&byte, rest) = buf.split_first()?;
        *buf = rest;

        if shift >= 64 || (shift == 63 && byte & 0x7E != 0) {
            return None;
        }
        value |= ((byte & 0x7F) as u64) << shift;

        if byte & 0x80 == 0 {
            break Some(value);
        }
        shift += 7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_values() {
        let values = [
            0_u64,
            1,
            42,
            127,
            128,
            300,
            16383,
            16384,
            1_000_000,
            u32::MAX as u64,
            u64::MAX,
        ];
        for &v in &values {
            let mut buf = DynBuf::new();
            encode_u64(v, &mut buf);
            let mut s: &[u8] = &buf;
            assert_eq!(decode_u64(&mut s), Some(v), "value {v} roundtrip");
            assert!(s.is_empty(), "buffer not fully consumed for {v}");
        }
    }

    #[test]
    fn encoding_shape_examples() {
        let mut buf = DynBuf::new();
        encode_u64(0, &mut buf);
        assert_eq!(&buf[..], &[0x00]);

        buf.clear();
        encode_u64(127, &mut buf);
        assert_eq!(&buf[..], &[0x7F]);

        buf.clear();
        encode_u64(128, &mut buf);
        assert_eq!(&buf[..], &[0x80, 0x01]);

        buf.clear();
        encode_u64(300, &mut buf);
        assert_eq!(&buf[..], &[0xAC, 0x02]);
    }

    #[test]
    fn decode_leaves_trailing_bytes() {
        let mut s: &[u8] = &[0xAC, 0x02, 0xFF];
        assert_eq!(decode_u64(&mut s), Some(300));
        assert_eq!(s, &[0xFF]);
    }

    #[test]
    fn decode_malformed_no_terminator() {
        let mut s: &[u8] = &[0x80, 0x80];
        assert_eq!(decode_u64(&mut s), None);
    }

    #[test]
    fn decode_overlong_rejected() {
        // 11 chunks cannot fit into a u64.
        let input = [vec![0x80u8; 10], vec![0x01]].concat();
        let mut s: &[u8] = &input;
        assert_eq!(decode_u64(&mut s), None);
    }
}
