//! The fixed record header.
//!
//! On-disk layout:
//! ```text
//! [0] magic1 (0x76, 'v')
//! [1] hflags: DLI(0-1) hidden(2) name width(3-4) name present(5) object width(6-7)
//! [2] aflags: compression(0-2) unused(3-4) present(5) width(6-7)
//! [3] bflags: same layout as aflags, for the body
//! [4] major type
//! [5] minor type
//! [6..] object length in 8-byte chunks, 1/2/4/8 bytes per the object width
//! ```
//!
//! Flags are decoded once into [`ObjectHeader`]; nothing downstream masks raw
//! flag bytes.

use std::fmt;

use crate::error::{Db5Error, Db5Result};
use crate::types::MajorType;
use crate::varint::WidthCode;

/// First byte of every v5 object.
pub const MAGIC1: u8 = 0x76;
/// Last byte of every v5 object.
pub const MAGIC2: u8 = 0x35;
/// Bytes 0-5: sentinel, flag bytes and type codes.
pub const FIXED_HEADER_LEN: usize = 6;
/// Storage granularity. Every object length is a multiple of this.
pub const CHUNK_LEN: usize = 8;
/// Smallest legal object: fixed header, one-byte length, magic2.
pub const MIN_OBJECT_LEN: usize = 8;

/// First byte of a v4 database record.
const V4_ID_MARKER: u8 = b'I';

const HFLAGS_DLI_MASK: u8 = 0x03;
const HFLAGS_HIDDEN: u8 = 0x04;
const HFLAGS_NAME_WIDTH_SHIFT: u8 = 3;
const HFLAGS_NAME_PRESENT: u8 = 0x20;
const HFLAGS_OBJECT_WIDTH_SHIFT: u8 = 6;

const PART_ZZZ_MASK: u8 = 0x07;
const PART_PRESENT: u8 = 0x20;
const PART_WIDTH_SHIFT: u8 = 6;

/// The canonical 8-byte header that opens every v5 database file.
pub const IDENTITY_HEADER: [u8; 8] = [MAGIC1, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, MAGIC2];

/// Role of an object within the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dli {
    ApplicationData,
    HeaderObject,
    FreeStorage,
}

impl Dli {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits & HFLAGS_DLI_MASK {
            0 => Some(Self::ApplicationData),
            1 => Some(Self::HeaderObject),
            2 => Some(Self::FreeStorage),
            _ => None,
        }
    }

    fn bits(self) -> u8 {
        match self {
            Self::ApplicationData => 0,
            Self::HeaderObject => 1,
            Self::FreeStorage => 2,
        }
    }
}

impl fmt::Display for Dli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ApplicationData => "app",
            Self::HeaderObject => "header",
            Self::FreeStorage => "free",
        })
    }
}

/// Compression applied to an attribute or body part.
///
/// Only `Uncompressed` is implemented; the other codes are reserved by the
/// format and rejected wherever they appear.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Compression {
    Uncompressed,
    Gzip,
    BurrowsWheeler,
    Reserved(u8),
}

impl Compression {
    fn from_bits(bits: u8) -> Self {
        match bits & PART_ZZZ_MASK {
            0 => Self::Uncompressed,
            1 => Self::Gzip,
            2 => Self::BurrowsWheeler,
            other => Self::Reserved(other),
        }
    }

    fn bits(self) -> u8 {
        match self {
            Self::Uncompressed => 0,
            Self::Gzip => 1,
            Self::BurrowsWheeler => 2,
            Self::Reserved(b) => b & PART_ZZZ_MASK,
        }
    }
}

/// Decoded `aflags` / `bflags`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PartFlags {
    pub present: bool,
    pub width: WidthCode,
    pub compression: Compression,
}

impl PartFlags {
    pub fn absent() -> Self {
        Self {
            present: false,
            width: WidthCode::W8,
            compression: Compression::Uncompressed,
        }
    }

    pub fn present(width: WidthCode) -> Self {
        Self {
            present: true,
            width,
            compression: Compression::Uncompressed,
        }
    }

    fn pack(self) -> u8 {
        let mut byte = (self.width.bits() << PART_WIDTH_SHIFT) | self.compression.bits();
        if self.present {
            byte |= PART_PRESENT;
        }
        byte
    }

    fn unpack(byte: u8) -> Self {
        Self {
            present: byte & PART_PRESENT != 0,
            width: WidthCode::from_bits(byte >> PART_WIDTH_SHIFT),
            compression: Compression::from_bits(byte),
        }
    }
}

/// Decoded fixed header of one object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectHeader {
    pub dli: Dli,
    pub hidden: bool,
    /// Width of the object-length field that follows byte 5.
    pub object_width: WidthCode,
    pub name_present: bool,
    pub name_width: WidthCode,
    pub attributes: PartFlags,
    pub body: PartFlags,
    pub major_type: MajorType,
    pub minor_type: u8,
}

impl ObjectHeader {
    /// Pack into bytes 0-5 of an object.
    pub fn pack(&self) -> [u8; FIXED_HEADER_LEN] {
        let mut hflags = (self.object_width.bits() << HFLAGS_OBJECT_WIDTH_SHIFT) | self.dli.bits();
        if self.hidden {
            hflags |= HFLAGS_HIDDEN;
        }
        if self.name_present {
            hflags |= HFLAGS_NAME_PRESENT;
        }
        hflags |= self.name_width.bits() << HFLAGS_NAME_WIDTH_SHIFT;

        [
            MAGIC1,
            hflags,
            self.attributes.pack(),
            self.body.pack(),
            self.major_type.as_byte(),
            self.minor_type,
        ]
    }

    /// Decode bytes 0-5 of an object.
    ///
    /// Fails on a bad `magic1` or an impossible DLI. Compression codes are
    /// decoded faithfully here; rejecting them is [`Self::ensure_uncompressed`]'s
    /// job so that the header of an unsupported object can still be reported.
    pub fn unpack(bytes: &[u8]) -> Db5Result<Self> {
        if bytes.len() < FIXED_HEADER_LEN {
            return Err(Db5Error::Truncated {
                needed: FIXED_HEADER_LEN as u64,
                available: bytes.len() as u64,
            });
        }
        if bytes[0] != MAGIC1 {
            let mut reason = format!("bad magic1: expected {MAGIC1:#04x}, got {:#04x}", bytes[0]);
            if bytes[0] == V4_ID_MARKER {
                reason.push_str(
                    " (v4 record found; databases of different versions were concatenated, \
                     upgrade them before concatenating)",
                );
            }
            return Err(Db5Error::malformed(0, reason));
        }

        let hflags = bytes[1];
        let dli = Dli::from_bits(hflags)
            .ok_or_else(|| Db5Error::malformed(1, format!("invalid DLI in hflags {hflags:#04x}")))?;

        Ok(Self {
            dli,
            hidden: hflags & HFLAGS_HIDDEN != 0,
            object_width: WidthCode::from_bits(hflags >> HFLAGS_OBJECT_WIDTH_SHIFT),
            name_present: hflags & HFLAGS_NAME_PRESENT != 0,
            name_width: WidthCode::from_bits(hflags >> HFLAGS_NAME_WIDTH_SHIFT),
            attributes: PartFlags::unpack(bytes[2]),
            body: PartFlags::unpack(bytes[3]),
            major_type: MajorType::from_byte(bytes[4]),
            minor_type: bytes[5],
        })
    }

    /// Reject any part that claims a compression code.
    pub fn ensure_uncompressed(&self) -> Db5Result<()> {
        for (part, flags) in [("attribute", self.attributes), ("body", self.body)] {
            if flags.compression != Compression::Uncompressed {
                return Err(Db5Error::UnsupportedFeature(format!(
                    "{part} compression {:?}",
                    flags.compression
                )));
            }
        }
        Ok(())
    }

    /// Byte count of the fixed header plus the object-length field.
    pub fn prefix_len(&self) -> usize {
        FIXED_HEADER_LEN + self.object_width.byte_len()
    }
}

/// True iff `bytes` starts with the exact canonical database identity header.
///
/// Every field is checked, including the bits that ordinary decoding
/// ignores, so any single-bit deviation is rejected.
pub fn is_identity_header(bytes: &[u8]) -> bool {
    if bytes.len() < IDENTITY_HEADER.len() {
        return false;
    }
    let header = match ObjectHeader::unpack(bytes) {
        Ok(h) => h,
        Err(_) => return false,
    };

    header.dli == Dli::HeaderObject
        && !header.hidden
        && !header.name_present
        && header.name_width == WidthCode::W8
        && header.object_width == WidthCode::W8
        && header.attributes == PartFlags::absent()
        && header.body == PartFlags::absent()
        && header.major_type == MajorType::Reserved
        && header.minor_type == 0
        && header.pack() == bytes[..FIXED_HEADER_LEN]
        && bytes[6] == 1
        && bytes[7] == MAGIC2
}
