//! Cracking an assembled object back into header, name, attributes and body.
//!
//! All structural checks (sentinels, declared length, part bounds) run
//! before a [`RawObject`] is handed out, so a caller never sees a partially
//! valid object. The parts are [`Extent`]s into the object's own buffer: for
//! [`crack_buffer`] that is a borrow of the caller's slice, for the stream
//! reader an owned [`Bytes`].

use std::ops::Range;

use bytes::Bytes;

use crate::attributes::AttributeSet;
use crate::error::{Db5Error, Db5Result};
use crate::header::{ObjectHeader, CHUNK_LEN, FIXED_HEADER_LEN, MAGIC2, MIN_OBJECT_LEN};
use crate::varint::{self, WidthCode};

/// Location of one part inside an object buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extent {
    pub offset: usize,
    pub len: usize,
}

impl Extent {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// A validated object whose parts index into `buf`.
#[derive(Clone, Debug)]
pub struct RawObject<B> {
    buf: B,
    header: ObjectHeader,
    object_len: usize,
    name: Option<Extent>,
    attributes: Option<Extent>,
    body: Option<Extent>,
}

/// Object cracked in place; borrows the caller's buffer.
pub type CrackedView<'a> = RawObject<&'a [u8]>;

/// Object read from a stream; owns its buffer.
pub type CrackedObject = RawObject<Bytes>;

impl<B: AsRef<[u8]>> RawObject<B> {
    /// Validate the object at the start of `buf` and locate its parts.
    ///
    /// `buf` may extend past the object; the excess is ignored.
    pub(crate) fn parse(buf: B) -> Db5Result<Self> {
        let bytes = buf.as_ref();
        let header = ObjectHeader::unpack(bytes)?;
        header.ensure_uncompressed()?;

        let (chunks, _) = varint::decode_unsigned(&bytes[FIXED_HEADER_LEN..], header.object_width)?;
        let object_len = chunks_to_len(chunks, header.object_width)?;
        check_object_len(&header, object_len)?;

        if object_len > bytes.len() {
            return Err(Db5Error::Truncated {
                needed: object_len as u64,
                available: bytes.len() as u64,
            });
        }
        if bytes[object_len - 1] != MAGIC2 {
            // The declared length overruns the real object, so its end was never seen.
            return Err(Db5Error::Truncated {
                needed: object_len as u64,
                available: (object_len - 1) as u64,
            });
        }

        // Parts must end before the trailing magic2.
        let limit = object_len - 1;
        let mut cursor = header.prefix_len();

        let name = if header.name_present {
            let extent = take_part(bytes, &mut cursor, limit, header.name_width)?;
            if bytes[extent.range()].last() != Some(&0) {
                return Err(Db5Error::malformed(
                    extent.offset as u64,
                    "object name is not NUL terminated",
                ));
            }
            Some(extent)
        } else {
            None
        };
        let attributes = if header.attributes.present {
            Some(take_part(bytes, &mut cursor, limit, header.attributes.width)?)
        } else {
            None
        };
        let body = if header.body.present {
            Some(take_part(bytes, &mut cursor, limit, header.body.width)?)
        } else {
            None
        };

        Ok(Self {
            buf,
            header,
            object_len,
            name,
            attributes,
            body,
        })
    }

    pub fn header(&self) -> &ObjectHeader {
        &self.header
    }

    /// Total object length in bytes. Also the offset of the next object when
    /// objects are concatenated.
    pub fn object_len(&self) -> usize {
        self.object_len
    }

    /// The object's bytes, header through magic2.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf.as_ref()[..self.object_len]
    }

    /// On-disk extent of the name, including its NUL terminator.
    pub fn name_extent(&self) -> Option<Extent> {
        self.name
    }

    pub fn attributes_extent(&self) -> Option<Extent> {
        self.attributes
    }

    pub fn body_extent(&self) -> Option<Extent> {
        self.body
    }

    /// Name bytes without the NUL terminator.
    pub fn name_bytes(&self) -> Option<&[u8]> {
        self.part(self.name).map(|n| &n[..n.len() - 1])
    }

    pub fn name(&self) -> Db5Result<Option<&str>> {
        self.name_bytes()
            .map(|n| {
                std::str::from_utf8(n).map_err(|e| {
                    Db5Error::InvalidName(format!("name is not UTF-8: {e}"))
                })
            })
            .transpose()
    }

    /// Raw attribute blob, if present.
    pub fn attribute_bytes(&self) -> Option<&[u8]> {
        self.part(self.attributes)
    }

    /// Decoded attributes; empty when the object carries none.
    pub fn attributes(&self) -> Db5Result<AttributeSet> {
        match self.attribute_bytes() {
            Some(blob) => AttributeSet::import(blob),
            None => Ok(AttributeSet::new()),
        }
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.part(self.body)
    }

    pub fn into_buffer(self) -> B {
        self.buf
    }

    fn part(&self, extent: Option<Extent>) -> Option<&[u8]> {
        extent.map(|e| &self.buf.as_ref()[e.range()])
    }
}

impl CrackedView<'_> {
    /// Copy this object out of the borrowed buffer.
    pub fn to_owned_object(&self) -> CrackedObject {
        RawObject {
            buf: Bytes::copy_from_slice(self.as_bytes()),
            header: self.header,
            object_len: self.object_len,
            name: self.name,
            attributes: self.attributes,
            body: self.body,
        }
    }
}

/// Crack the object at the start of `buf` without copying.
///
/// The returned view's [`RawObject::object_len`] is the cursor just past this
/// object, which is where the next object of a concatenation begins.
pub fn crack_buffer(buf: &[u8]) -> Db5Result<CrackedView<'_>> {
    RawObject::parse(buf)
}

/// Walks a buffer holding back-to-back objects.
///
/// Yields `(offset, view)` pairs. Iteration stops after the first error,
/// since a damaged length field leaves no way to find the next object.
#[derive(Debug)]
pub struct ObjectIter<'a> {
    buf: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> ObjectIter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            failed: false,
        }
    }
}

impl<'a> Iterator for ObjectIter<'a> {
    type Item = Db5Result<(usize, CrackedView<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.buf.len() {
            return None;
        }
        let offset = self.pos;
        match crack_buffer(&self.buf[offset..]) {
            Ok(view) => {
                self.pos += view.object_len();
                Some(Ok((offset, view)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Convert a stored chunk count to a byte length on this host.
pub(crate) fn chunks_to_len(chunks: u64, width: WidthCode) -> Db5Result<usize> {
    chunks
        .checked_mul(CHUNK_LEN as u64)
        .and_then(|len| usize::try_from(len).ok())
        .ok_or(Db5Error::LengthOverflow {
            value: chunks,
            width,
        })
}

/// Reject declared lengths too short to hold the header and magic2.
pub(crate) fn check_object_len(header: &ObjectHeader, object_len: usize) -> Db5Result<()> {
    if object_len < MIN_OBJECT_LEN || object_len < header.prefix_len() + 1 {
        return Err(Db5Error::malformed(
            FIXED_HEADER_LEN as u64,
            format!("object length {object_len} is smaller than its header"),
        ));
    }
    Ok(())
}

/// Decode one length-prefixed part at `*cursor`, advancing past it.
fn take_part(
    bytes: &[u8],
    cursor: &mut usize,
    limit: usize,
    width: WidthCode,
) -> Db5Result<Extent> {
    let (len, consumed) = varint::decode_len(&bytes[*cursor..limit], width)?;
    let offset = *cursor + consumed;
    let end = offset.checked_add(len).filter(|&end| end <= limit).ok_or(Db5Error::Truncated {
        needed: (offset as u64).saturating_add(len as u64).saturating_add(1),
        available: (limit + 1) as u64,
    })?;
    *cursor = end;
    Ok(Extent { offset, len })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{Dli, MAGIC1};
    use crate::object::{assemble, ObjectBuilder};
    use crate::types::MajorType;

    fn sample() -> Vec<u8> {
        let mut avs = AttributeSet::new();
        avs.insert("k", "v").unwrap();
        ObjectBuilder::new(Dli::ApplicationData, MajorType::BrlCad, 10)
            .name("sph.s")
            .attributes(avs.export().as_slice())
            .body(&b"0123456789"[..])
            .build()
            .unwrap()
            .into_bytes()
            .to_vec()
    }

    #[test]
    fn crack_reports_extents() {
        let buf = sample();
        let view = crack_buffer(&buf).unwrap();
        let name = view.name_extent().unwrap();
        assert_eq!(&buf[name.range()], b"sph.s\0");
        assert_eq!(view.name_bytes(), Some(&b"sph.s"[..]));
        assert_eq!(view.attribute_bytes(), Some(&b"k\0v\0\0"[..]));
        assert_eq!(view.body(), Some(&b"0123456789"[..]));
        assert_eq!(view.as_bytes(), &buf[..]);
    }

    #[test]
    fn crack_ignores_trailing_bytes() {
        let mut buf = sample();
        let len = buf.len();
        buf.extend_from_slice(&[0xEE; 13]);
        let view = crack_buffer(&buf).unwrap();
        assert_eq!(view.object_len(), len);
    }

    #[test]
    fn truncated_by_one_byte() {
        let buf = sample();
        let err = crack_buffer(&buf[..buf.len() - 1]).unwrap_err();
        assert!(matches!(err, Db5Error::Truncated { .. }), "{err}");
    }

    #[test]
    fn bad_magic2_is_truncation() {
        let mut buf = sample();
        let last = buf.len() - 1;
        buf[last] = 0;
        match crack_buffer(&buf) {
            Err(Db5Error::Truncated { needed, available }) => {
                assert_eq!(needed, buf.len() as u64);
                assert_eq!(available, last as u64);
            }
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn bad_magic1() {
        let mut buf = sample();
        buf[0] = b'I';
        assert!(matches!(
            crack_buffer(&buf),
            Err(Db5Error::MalformedHeader { offset: 0, .. })
        ));
    }

    #[test]
    fn zero_length_is_rejected() {
        let buf = [MAGIC1, 0, 0, 0, 0, 0, 0, MAGIC2];
        assert!(matches!(
            crack_buffer(&buf),
            Err(Db5Error::MalformedHeader { .. })
        ));
    }

    #[test]
    fn part_overrunning_object_is_truncated() {
        let mut buf = sample();
        // Name length lives right after the 1-byte object length.
        buf[7] = 200;
        assert!(matches!(crack_buffer(&buf), Err(Db5Error::Truncated { .. })));
    }

    #[test]
    fn compressed_body_is_unsupported() {
        let mut buf = sample();
        buf[3] |= 0x02;
        assert!(matches!(
            crack_buffer(&buf),
            Err(Db5Error::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn name_without_nul_is_rejected() {
        let mut buf = sample();
        // "sph.s\0" starts at 8; clobber the terminator.
        buf[13] = b'x';
        assert!(matches!(
            crack_buffer(&buf),
            Err(Db5Error::MalformedHeader { .. })
        ));
    }

    #[test]
    fn iterate_concatenation() {
        let a = assemble(
            Dli::ApplicationData,
            Some("a"),
            None,
            None,
            MajorType::BrlCad,
            1,
        )
        .unwrap();
        let b = assemble(
            Dli::ApplicationData,
            Some("b"),
            None,
            Some(&b"xyz"[..]),
            MajorType::BrlCad,
            2,
        )
        .unwrap();
        let mut buf = a.as_bytes().to_vec();
        buf.extend_from_slice(b.as_bytes());

        let items: Vec<_> = ObjectIter::new(&buf).collect::<Db5Result<_>>().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].0, 0);
        assert_eq!(items[1].0, a.len());
        assert_eq!(items[1].1.name().unwrap(), Some("b"));
        assert_eq!(items[1].1.body(), Some(&b"xyz"[..]));
    }

    #[test]
    fn iteration_stops_after_error() {
        let a = assemble(
            Dli::ApplicationData,
            Some("a"),
            None,
            None,
            MajorType::BrlCad,
            1,
        )
        .unwrap();
        let mut buf = a.as_bytes().to_vec();
        buf.extend_from_slice(&[0u8; 16]);
        let mut iter = ObjectIter::new(&buf);
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }

    #[test]
    fn owned_copy_outlives_buffer() {
        let owned = {
            let buf = sample();
            let view = crack_buffer(&buf).unwrap();
            view.to_owned_object()
        };
        assert_eq!(owned.name().unwrap(), Some("sph.s"));
        assert_eq!(owned.body(), Some(&b"0123456789"[..]));
    }
}
