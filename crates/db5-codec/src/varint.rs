//! Adaptive-width big-endian integers.
//!
//! Every length field in a v5 record is stored in 1, 2, 4 or 8 bytes. The
//! width is selected per field by a 2-bit code carried in the header flags,
//! so small objects pay one byte per length while multi-gigabyte bodies are
//! still representable.

use std::fmt;

use crate::error::{Db5Error, Db5Result};

/// 2-bit selector among the four length encodings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WidthCode {
    W8 = 0,
    W16 = 1,
    W32 = 2,
    W64 = 3,
}

impl WidthCode {
    /// Decode from the low two bits of `bits`.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::W8,
            1 => Self::W16,
            2 => Self::W32,
            _ => Self::W64,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Number of bytes a field of this width occupies.
    pub fn byte_len(self) -> usize {
        match self {
            Self::W8 => 1,
            Self::W16 => 2,
            Self::W32 => 4,
            Self::W64 => 8,
        }
    }

    /// Largest unsigned value this width can hold.
    pub fn max_value(self) -> u64 {
        match self {
            Self::W8 => u8::MAX as u64,
            Self::W16 => u16::MAX as u64,
            Self::W32 => u32::MAX as u64,
            Self::W64 => u64::MAX,
        }
    }
}

impl fmt::Display for WidthCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.byte_len() * 8)
    }
}

/// Pick the narrowest width that holds `n`.
///
/// The 32-bit cutoff stops short of `u32::MAX` so that values near the top
/// stay readable by signed 32-bit decoders.
pub fn select_width(n: u64) -> WidthCode {
    if n <= 0xFF {
        WidthCode::W8
    } else if n <= 0xFFFF {
        WidthCode::W16
    } else if n < 0x7FFF_FFFE {
        WidthCode::W32
    } else {
        WidthCode::W64
    }
}

/// Write `value` big-endian into the first `width.byte_len()` bytes of `out`.
///
/// Returns the number of bytes written.
pub fn encode_into(out: &mut [u8], value: u64, width: WidthCode) -> Db5Result<usize> {
    if value > width.max_value() {
        return Err(Db5Error::LengthOverflow { value, width });
    }
    let n = width.byte_len();
    if out.len() < n {
        return Err(Db5Error::Truncated {
            needed: n as u64,
            available: out.len() as u64,
        });
    }
    out[..n].copy_from_slice(&value.to_be_bytes()[8 - n..]);
    Ok(n)
}

/// Append `value` to `buf` in exactly `width.byte_len()` bytes.
pub fn encode(buf: &mut Vec<u8>, value: u64, width: WidthCode) -> Db5Result<usize> {
    if value > width.max_value() {
        return Err(Db5Error::LengthOverflow { value, width });
    }
    let start = buf.len();
    buf.resize(start + width.byte_len(), 0);
    encode_into(&mut buf[start..], value, width)
}

/// Decode an unsigned value. Returns `(value, bytes_consumed)`.
pub fn decode_unsigned(bytes: &[u8], width: WidthCode) -> Db5Result<(u64, usize)> {
    let n = width.byte_len();
    if bytes.len() < n {
        return Err(Db5Error::Truncated {
            needed: n as u64,
            available: bytes.len() as u64,
        });
    }
    let mut raw = [0u8; 8];
    raw[8 - n..].copy_from_slice(&bytes[..n]);
    Ok((u64::from_be_bytes(raw), n))
}

/// Decode a signed value, sign-extending from the encoded width.
pub fn decode_signed(bytes: &[u8], width: WidthCode) -> Db5Result<(i64, usize)> {
    let (raw, n) = decode_unsigned(bytes, width)?;
    let value = match width {
        WidthCode::W8 => raw as u8 as i8 as i64,
        WidthCode::W16 => raw as u16 as i16 as i64,
        WidthCode::W32 => raw as u32 as i32 as i64,
        WidthCode::W64 => raw as i64,
    };
    Ok((value, n))
}

/// Decode a length and convert it to a host `usize`.
///
/// Lengths that do not fit the host's address space are reported as
/// [`Db5Error::LengthOverflow`] rather than truncated.
pub fn decode_len(bytes: &[u8], width: WidthCode) -> Db5Result<(usize, usize)> {
    let (value, n) = decode_unsigned(bytes, width)?;
    let len = usize::try_from(value).map_err(|_| Db5Error::LengthOverflow { value, width })?;
    Ok((len, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_width_boundaries() {
        assert_eq!(select_width(0), WidthCode::W8);
        assert_eq!(select_width(255), WidthCode::W8);
        assert_eq!(select_width(256), WidthCode::W16);
        assert_eq!(select_width(65535), WidthCode::W16);
        assert_eq!(select_width(65536), WidthCode::W32);
        assert_eq!(select_width(0x7FFF_FFFD), WidthCode::W32);
        assert_eq!(select_width(0x7FFF_FFFE), WidthCode::W64);
        assert_eq!(select_width(u64::MAX), WidthCode::W64);
    }

    #[test]
    fn selected_width_is_minimal_and_roundtrips() {
        let all = [WidthCode::W8, WidthCode::W16, WidthCode::W32, WidthCode::W64];
        for n in [0u64, 255, 256, 65535, 65536, 0x7FFF_FFFD] {
            let w = select_width(n);
            let mut buf = Vec::new();
            encode(&mut buf, n, w).unwrap();
            assert_eq!(buf.len(), w.byte_len());
            assert_eq!(decode_unsigned(&buf, w).unwrap(), (n, w.byte_len()));

            // Every narrower width must be unable to hold n.
            for narrower in all.iter().filter(|c| **c < w) {
                let mut buf = Vec::new();
                assert!(encode(&mut buf, n, *narrower).is_err(), "{n} fits in {narrower}");
            }
        }
    }

    #[test]
    fn encode_is_big_endian() {
        let mut buf = Vec::new();
        encode(&mut buf, 0x0102, WidthCode::W16).unwrap();
        encode(&mut buf, 0x0A0B0C0D, WidthCode::W32).unwrap();
        assert_eq!(buf, [0x01, 0x02, 0x0A, 0x0B, 0x0C, 0x0D]);
    }

    #[test]
    fn encode_rejects_value_too_wide() {
        let mut out = [0u8; 1];
        let err = encode_into(&mut out, 300, WidthCode::W8).unwrap_err();
        assert!(matches!(err, Db5Error::LengthOverflow { value: 300, .. }));
    }

    #[test]
    fn encode_into_short_slice() {
        let mut out = [0u8; 3];
        assert!(matches!(
            encode_into(&mut out, 1, WidthCode::W32),
            Err(Db5Error::Truncated { needed: 4, available: 3 })
        ));
    }

    #[test]
    fn decode_signed_sign_extends() {
        assert_eq!(decode_signed(&[0xFF], WidthCode::W8).unwrap(), (-1, 1));
        assert_eq!(decode_signed(&[0x7F], WidthCode::W8).unwrap(), (127, 1));
        assert_eq!(decode_signed(&[0x80, 0x00], WidthCode::W16).unwrap(), (-32768, 2));
        assert_eq!(
            decode_signed(&[0xFF, 0xFF, 0xFF, 0xFE], WidthCode::W32).unwrap(),
            (-2, 4)
        );
        assert_eq!(
            decode_signed(&[0xFF; 8], WidthCode::W64).unwrap(),
            (-1, 8)
        );
    }

    #[test]
    fn decode_unsigned_does_not_sign_extend() {
        assert_eq!(decode_unsigned(&[0xFF], WidthCode::W8).unwrap(), (255, 1));
    }

    #[test]
    fn decode_truncated_input() {
        let err = decode_unsigned(&[0x01, 0x02], WidthCode::W64).unwrap_err();
        assert!(matches!(err, Db5Error::Truncated { needed: 8, available: 2 }));
    }

    #[test]
    fn width_code_bits_roundtrip() {
        for bits in 0..4u8 {
            assert_eq!(WidthCode::from_bits(bits).bits(), bits);
        }
        assert_eq!(WidthCode::from_bits(0xC2), WidthCode::W32);
    }
}
