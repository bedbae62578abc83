//! Free-storage placeholder objects.
//!
//! A freed region of the file is stamped as a free-storage object of the
//! same length so that a sequential scan can step over it and the allocator
//! above can reuse it. Only the header, length field and trailing magic2 of
//! a free object are ever interpreted; whatever lies between is ignored.

use std::io::{Seek, SeekFrom, Write};

use tracing::debug;

use crate::error::{Db5Error, Db5Result};
use crate::header::{Dli, ObjectHeader, PartFlags, CHUNK_LEN, MAGIC2, MIN_OBJECT_LEN};
use crate::object::AssembledObject;
use crate::types::MajorType;
use crate::varint::{self, select_width, WidthCode};

/// Regions up to this size are written as complete zero-filled objects.
pub const FULL_FREE_OBJECT_LIMIT: u64 = 8192;

/// Header and length field for a free region, without its body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FreeHeader {
    bytes: Vec<u8>,
    region_len: u64,
}

impl FreeHeader {
    /// Bytes to write at the start of the region.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn region_len(&self) -> u64 {
        self.region_len
    }

    /// Offset, relative to the region start, where [`MAGIC2`] must be written.
    pub fn trailer_offset(&self) -> u64 {
        self.region_len - 1
    }
}

/// Build just the header of a free object spanning `length` bytes.
///
/// The caller writes these bytes at the region start and [`MAGIC2`] at
/// [`FreeHeader::trailer_offset`]; the rest of the region is left alone.
pub fn make_free_header(length: u64) -> Db5Result<FreeHeader> {
    let header = free_object_header(length)?;
    let mut bytes = Vec::with_capacity(header.prefix_len());
    bytes.extend_from_slice(&header.pack());
    varint::encode(&mut bytes, length / CHUNK_LEN as u64, header.object_width)?;
    Ok(FreeHeader {
        bytes,
        region_len: length,
    })
}

/// Build a complete, zero-filled free object of exactly `length` bytes.
pub fn make_free_object(length: u64) -> Db5Result<AssembledObject> {
    let header = make_free_header(length)?;
    let len = usize::try_from(length).map_err(|_| Db5Error::LengthOverflow {
        value: length,
        width: WidthCode::W64,
    })?;

    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Db5Error::AllocationFailure { bytes: length })?;
    buf.extend_from_slice(header.as_bytes());
    buf.resize(len, 0);
    buf[len - 1] = MAGIC2;
    Ok(AssembledObject::from_vec(buf))
}

/// Stamp the region `[offset, offset + length)` of `dst` as free storage.
///
/// Small regions get a full zero-filled object. Large ones get only the
/// header and the trailing magic2, leaving the stale bytes between them.
pub fn write_free_region<W: Write + Seek + ?Sized>(
    dst: &mut W,
    offset: u64,
    length: u64,
) -> Db5Result<()> {
    if length <= FULL_FREE_OBJECT_LIMIT {
        let obj = make_free_object(length)?;
        dst.seek(SeekFrom::Start(offset))?;
        dst.write_all(obj.as_bytes())?;
    } else {
        let header = make_free_header(length)?;
        dst.seek(SeekFrom::Start(offset))?;
        dst.write_all(header.as_bytes())?;
        dst.seek(SeekFrom::Start(offset + header.trailer_offset()))?;
        dst.write_all(&[MAGIC2])?;
    }
    debug!(offset, length, "free region written");
    Ok(())
}

fn free_object_header(length: u64) -> Db5Result<ObjectHeader> {
    if length < MIN_OBJECT_LEN as u64 || length % CHUNK_LEN as u64 != 0 {
        return Err(Db5Error::InvalidFreeLength(length));
    }
    Ok(ObjectHeader {
        dli: Dli::FreeStorage,
        hidden: false,
        object_width: select_width(length / CHUNK_LEN as u64),
        name_present: false,
        name_width: WidthCode::W8,
        attributes: PartFlags::absent(),
        body: PartFlags::absent(),
        major_type: MajorType::Reserved,
        minor_type: 0,
    })
}
