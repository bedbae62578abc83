//! Codec for BRL-CAD v5 (`db5`) database objects.
//!
//! A v5 database is an identity header followed by a concatenation of
//! self-describing objects. Each object is a multiple of 8 bytes and is
//! framed by `magic1` (`0x76`) and `magic2` (`0x35`):
//!
//! ```text
//! magic1 hflags aflags bflags major minor | object_len | name | attrs | body | pad | magic2
//! ```
//!
//! Lengths are stored in 1, 2, 4 or 8 byte big-endian fields whose width
//! is recorded in the flag bytes.
//!
//! # Architecture
//!
//! - **varint / header**: width-coded integers and the 6-byte fixed header
//! - **attributes**: NUL-delimited name/value sets
//! - **object**: `ObjectBuilder` assembles an object from its parts
//! - **crack / stream**: validate and split an object held in memory or
//!   read from a stream
//! - **free / update / ident / color**: free-storage objects, attribute
//!   rewrites, the database preamble and the region color table
//! - **scan**: sequential walk over a whole database file

pub mod attributes;
pub mod color;
pub mod config;
pub mod crack;
pub mod error;
pub mod free;
pub mod header;
pub mod ident;
pub mod object;
pub mod scan;
pub mod stream;
pub mod types;
pub mod update;
pub mod varint;

pub use attributes::AttributeSet;
pub use color::{ColorRange, ColorTable, COLOR_TABLE_ATTRIBUTE};
pub use config::ReadConfig;
pub use crack::{crack_buffer, CrackedObject, CrackedView, Extent, ObjectIter, RawObject};
pub use error::{Db5Error, Db5Result};
pub use free::{make_free_header, make_free_object, write_free_region, FreeHeader};
pub use header::{
    is_identity_header, Compression, Dli, ObjectHeader, PartFlags, IDENTITY_HEADER, MAGIC1, MAGIC2,
};
pub use ident::{
    global_object, read_ident, update_ident, write_ident, GlobalInfo, GLOBAL_OBJECT_NAME,
};
pub use object::{assemble, AssembledObject, ObjectBuilder};
pub use scan::{scan, ObjectReader, ScanSummary};
pub use stream::{crack_stream, crack_stream_with};
pub use types::{codes_from_tag, type_description, type_tag, MajorType};
pub use update::{replace_attributes, update_attribute, update_object_attributes};
pub use varint::WidthCode;
