use bytes::Bytes;

use crate::crack::{crack_buffer, CrackedView};
use crate::error::{Db5Error, Db5Result};
use crate::header::{
    Compression, Dli, ObjectHeader, PartFlags, CHUNK_LEN, FIXED_HEADER_LEN, MAGIC2,
};
use crate::types::MajorType;
use crate::varint::{self, select_width, WidthCode};

/// Worst-case bytes for one length field.
const MAX_LENGTH_FIELD: usize = 8;

/// A complete, chunk-aligned, sentinel-terminated object ready to be written.
///
/// Never edited in place: renaming or changing attributes can change the
/// width of any length field, so every edit assembles a new object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembledObject {
    bytes: Bytes,
}

impl AssembledObject {
    pub(crate) fn from_vec(buf: Vec<u8>) -> Self {
        debug_assert!(buf.len() >= CHUNK_LEN && buf.len() % CHUNK_LEN == 0);
        Self {
            bytes: Bytes::from(buf),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; an assembled object is at least one chunk long.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hand the buffer to the file layer.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Crack this object back into its parts.
    pub fn crack(&self) -> Db5Result<CrackedView<'_>> {
        crack_buffer(&self.bytes)
    }
}

impl AsRef<[u8]> for AssembledObject {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Collects the parts of an object and assembles them into a buffer.
///
/// ```
/// use db5_codec::{Dli, MajorType, ObjectBuilder};
/// use db5_codec::types::brlcad;
///
/// let body = [0u8; 12];
/// let obj = ObjectBuilder::new(Dli::ApplicationData, MajorType::BrlCad, brlcad::ELL)
///     .name("ell.s")
///     .body(&body[..])
///     .build()
///     .unwrap();
/// assert_eq!(obj.len() % 8, 0);
/// ```
#[derive(Clone, Debug)]
pub struct ObjectBuilder<'a> {
    dli: Dli,
    major_type: MajorType,
    minor_type: u8,
    hidden: bool,
    name: Option<&'a str>,
    attributes: Option<&'a [u8]>,
    body: Option<&'a [u8]>,
    attribute_compression: Compression,
    body_compression: Compression,
}

impl<'a> ObjectBuilder<'a> {
    pub fn new(dli: Dli, major_type: MajorType, minor_type: u8) -> Self {
        Self {
            dli,
            major_type,
            minor_type,
            hidden: false,
            name: None,
            attributes: None,
            body: None,
            attribute_compression: Compression::Uncompressed,
            body_compression: Compression::Uncompressed,
        }
    }

    pub fn name(mut self, name: impl Into<Option<&'a str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Exported attribute blob. An empty blob is treated as absent.
    pub fn attributes(mut self, attributes: impl Into<Option<&'a [u8]>>) -> Self {
        self.attributes = attributes.into();
        self
    }

    /// Opaque body bytes. An empty body is treated as absent.
    pub fn body(mut self, body: impl Into<Option<&'a [u8]>>) -> Self {
        self.body = body.into();
        self
    }

    /// Request compression for the attribute and body parts.
    ///
    /// Anything but [`Compression::Uncompressed`] makes [`Self::build`] fail.
    pub fn compression(mut self, attributes: Compression, body: Compression) -> Self {
        self.attribute_compression = attributes;
        self.body_compression = body;
        self
    }

    pub fn build(&self) -> Db5Result<AssembledObject> {
        for (part, zzz) in [
            ("attribute", self.attribute_compression),
            ("body", self.body_compression),
        ] {
            if zzz != Compression::Uncompressed {
                return Err(Db5Error::UnsupportedFeature(format!(
                    "{part} compression {zzz:?} is not implemented"
                )));
            }
        }
        if let Some(name) = self.name {
            if name.contains('\0') {
                return Err(Db5Error::InvalidName(format!("{name:?} contains NUL")));
            }
        }

        // The stored name carries its NUL terminator.
        let name_len = self.name.map(|n| n.len() + 1);
        let attributes = self.attributes.filter(|a| !a.is_empty());
        let body = self.body.filter(|b| !b.is_empty());

        // Upper bound: every length field at its widest, plus a full chunk
        // for padding and magic2.
        let need = [name_len, attributes.map(<[u8]>::len), body.map(<[u8]>::len)]
            .into_iter()
            .flatten()
            .try_fold(FIXED_HEADER_LEN + MAX_LENGTH_FIELD + CHUNK_LEN, |acc, len| {
                acc.checked_add(len)?.checked_add(MAX_LENGTH_FIELD)
            })
            .ok_or(Db5Error::AllocationFailure { bytes: u64::MAX })?;

        // Sized from the byte estimate, so it always covers the chunk count.
        let object_width = select_width(need as u64);
        let part = |bytes: Option<&[u8]>| match bytes {
            Some(b) => PartFlags::present(select_width(b.len() as u64)),
            None => PartFlags::absent(),
        };
        let header = ObjectHeader {
            dli: self.dli,
            hidden: self.hidden,
            object_width,
            name_present: name_len.is_some(),
            name_width: name_len.map_or(WidthCode::W8, |n| select_width(n as u64)),
            attributes: part(attributes),
            body: part(body),
            major_type: self.major_type,
            minor_type: self.minor_type,
        };

        let mut buf = Vec::new();
        buf.try_reserve_exact(need)
            .map_err(|_| Db5Error::AllocationFailure { bytes: need as u64 })?;

        buf.extend_from_slice(&header.pack());
        let length_pos = buf.len();
        varint::encode(&mut buf, 0, object_width)?;

        if let (Some(name), Some(len)) = (self.name, name_len) {
            varint::encode(&mut buf, len as u64, header.name_width)?;
            buf.extend_from_slice(name.as_bytes());
            buf.push(0);
        }
        if let Some(attributes) = attributes {
            varint::encode(&mut buf, attributes.len() as u64, header.attributes.width)?;
            buf.extend_from_slice(attributes);
        }
        if let Some(body) = body {
            varint::encode(&mut buf, body.len() as u64, header.body.width)?;
            buf.extend_from_slice(body);
        }

        // Pad so that magic2 lands on the last byte of a chunk.
        while (buf.len() + 1) % CHUNK_LEN != 0 {
            buf.push(0);
        }
        buf.push(MAGIC2);

        let chunks = (buf.len() / CHUNK_LEN) as u64;
        varint::encode_into(&mut buf[length_pos..], chunks, object_width)?;

        Ok(AssembledObject::from_vec(buf))
    }
}

/// Assemble an object from its optional parts.
pub fn assemble(
    dli: Dli,
    name: Option<&str>,
    attributes: Option<&[u8]>,
    body: Option<&[u8]>,
    major_type: MajorType,
    minor_type: u8,
) -> Db5Result<AssembledObject> {
    ObjectBuilder::new(dli, major_type, minor_type)
        .name(name)
        .attributes(attributes)
        .body(body)
        .build()
}
