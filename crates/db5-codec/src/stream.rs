//! Reading whole objects from a sequential byte stream.
//!
//! The stream form reads the fixed header, then the object-length field, and
//! only then allocates a buffer of exactly the declared size. A stream that
//! ends before the first header byte is a clean [`Db5Error::Eof`]; a stream
//! that ends anywhere later is [`Db5Error::Truncated`].

use std::io::{self, Read};

use bytes::Bytes;

use crate::config::ReadConfig;
use crate::crack::{check_object_len, chunks_to_len, CrackedObject, RawObject};
use crate::error::{Db5Error, Db5Result};
use crate::header::{ObjectHeader, FIXED_HEADER_LEN};
use crate::varint;

/// Read and crack the next object, with no length ceiling.
pub fn crack_stream<R: Read + ?Sized>(reader: &mut R) -> Db5Result<CrackedObject> {
    crack_stream_with(reader, &ReadConfig::unbounded())
}

/// Read and crack the next object, honouring `config.max_object_len`.
pub fn crack_stream_with<R: Read + ?Sized>(
    reader: &mut R,
    config: &ReadConfig,
) -> Db5Result<CrackedObject> {
    let mut fixed = [0u8; FIXED_HEADER_LEN];
    match read_full(reader, &mut fixed)? {
        0 => return Err(Db5Error::Eof),
        n if n < FIXED_HEADER_LEN => {
            return Err(Db5Error::Truncated {
                needed: FIXED_HEADER_LEN as u64,
                available: n as u64,
            })
        }
        _ => {}
    }
    let header = ObjectHeader::unpack(&fixed)?;
    header.ensure_uncompressed()?;

    let width = header.object_width.byte_len();
    let mut length_field = [0u8; 8];
    let got = read_full(reader, &mut length_field[..width])?;
    if got < width {
        return Err(Db5Error::Truncated {
            needed: (FIXED_HEADER_LEN + width) as u64,
            available: (FIXED_HEADER_LEN + got) as u64,
        });
    }
    let (chunks, _) = varint::decode_unsigned(&length_field[..width], header.object_width)?;
    let object_len = chunks_to_len(chunks, header.object_width)?;
    check_object_len(&header, object_len)?;
    if object_len as u64 > config.max_object_len {
        return Err(Db5Error::ObjectTooLarge {
            len: object_len as u64,
            limit: config.max_object_len,
        });
    }

    let mut buf = Vec::new();
    buf.try_reserve_exact(object_len)
        .map_err(|_| Db5Error::AllocationFailure {
            bytes: object_len as u64,
        })?;
    buf.extend_from_slice(&fixed);
    buf.extend_from_slice(&length_field[..width]);
    let remaining = (object_len - buf.len()) as u64;

    // Grows into the reserved capacity only as bytes actually arrive.
    reader.take(remaining).read_to_end(&mut buf)?;
    if buf.len() < object_len {
        return Err(Db5Error::Truncated {
            needed: object_len as u64,
            available: buf.len() as u64,
        });
    }

    RawObject::parse(Bytes::from(buf))
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
///
/// Returns the number of bytes read, which is less than `buf.len()` only if
/// the stream ended.
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::attributes::AttributeSet;
    use crate::header::Dli;
    use crate::object::{assemble, ObjectBuilder};
    use crate::types::MajorType;

    /// Hands out at most `step` bytes per read call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn sample() -> Vec<u8> {
        let mut avs = AttributeSet::new();
        avs.insert("region_id", "1000").unwrap();
        ObjectBuilder::new(Dli::ApplicationData, MajorType::BrlCad, 31)
            .name("r1")
            .attributes(avs.export().as_slice())
            .body(&[7u8; 40][..])
            .build()
            .unwrap()
            .into_bytes()
            .to_vec()
    }

    #[test]
    fn stream_crack_matches_buffer_crack() {
        let buf = sample();
        let obj = crack_stream(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(obj.as_bytes(), &buf[..]);
        assert_eq!(obj.name().unwrap(), Some("r1"));
        assert_eq!(obj.attributes().unwrap().get("region_id"), Some("1000"));
        assert_eq!(obj.body(), Some(&[7u8; 40][..]));
    }

    #[test]
    fn empty_stream_is_eof() {
        let err = crack_stream(&mut Cursor::new(Vec::<u8>::new())).unwrap_err();
        assert!(matches!(err, Db5Error::Eof));
    }

    #[test]
    fn partial_header_is_truncated() {
        let buf = sample();
        let err = crack_stream(&mut Cursor::new(&buf[..3])).unwrap_err();
        assert!(matches!(err, Db5Error::Truncated { needed: 6, available: 3 }));
    }

    #[test]
    fn partial_length_field_is_truncated() {
        let body = vec![0u8; 300];
        let obj = assemble(
            Dli::ApplicationData,
            None,
            None,
            Some(body.as_slice()),
            MajorType::BrlCad,
            1,
        )
        .unwrap();
        // 16-bit object length: stop after its first byte.
        let err = crack_stream(&mut Cursor::new(&obj.as_bytes()[..7])).unwrap_err();
        assert!(matches!(err, Db5Error::Truncated { needed: 8, available: 7 }));
    }

    #[test]
    fn short_body_is_truncated_not_eof() {
        let buf = sample();
        let err = crack_stream(&mut Cursor::new(&buf[..buf.len() - 1])).unwrap_err();
        assert!(matches!(err, Db5Error::Truncated { .. }));
    }

    #[test]
    fn sequential_reads_then_eof() {
        let mut buf = sample();
        buf.extend_from_slice(&sample());
        let mut cursor = Cursor::new(buf);
        assert!(crack_stream(&mut cursor).is_ok());
        assert!(crack_stream(&mut cursor).is_ok());
        assert!(matches!(crack_stream(&mut cursor), Err(Db5Error::Eof)));
    }

    #[test]
    fn tolerates_short_reads() {
        let buf = sample();
        let mut reader = Trickle { data: &buf, step: 3 };
        let obj = crack_stream(&mut reader).unwrap();
        assert_eq!(obj.object_len(), buf.len());
    }

    #[test]
    fn length_ceiling_is_enforced() {
        let buf = sample();
        let config = ReadConfig {
            max_object_len: 16,
            ..ReadConfig::default()
        };
        let err = crack_stream_with(&mut Cursor::new(&buf), &config).unwrap_err();
        assert!(matches!(err, Db5Error::ObjectTooLarge { limit: 16, .. }));
    }

    #[test]
    fn absurd_length_does_not_allocate() {
        // 64-bit object width, chunk count near u64::MAX / 8.
        let mut buf = vec![0x76, 0xC0, 0, 0, 0, 0];
        buf.extend_from_slice(&(u64::MAX / 16).to_be_bytes());
        let err = crack_stream_with(&mut Cursor::new(&buf), &ReadConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            Db5Error::ObjectTooLarge { .. } | Db5Error::LengthOverflow { .. }
        ));
    }

    #[test]
    fn bad_magic_in_stream() {
        let mut buf = sample();
        buf[0] = 0;
        assert!(matches!(
            crack_stream(&mut Cursor::new(&buf)),
            Err(Db5Error::MalformedHeader { .. })
        ));
    }

    #[test]
    fn missing_trailing_magic_in_stream() {
        let mut buf = sample();
        let last = buf.len() - 1;
        buf[last] = 0;
        buf.extend_from_slice(&[0u8; 16]);
        assert!(matches!(
            crack_stream(&mut Cursor::new(&buf)),
            Err(Db5Error::Truncated { .. })
        ));
    }
}
