use thiserror::Error;

use crate::varint::WidthCode;

/// Errors produced while encoding or decoding v5 records.
#[derive(Debug, Error)]
pub enum Db5Error {
    /// Bad leading magic byte or an impossible flag combination.
    #[error("malformed header at offset {offset}: {reason}")]
    MalformedHeader { offset: u64, reason: String },

    /// The record claims more bytes than are available, or its trailing
    /// sentinel is missing.
    #[error("truncated object: need {needed} bytes, have {available}")]
    Truncated { needed: u64, available: u64 },

    /// A compression code other than "uncompressed" was requested or found.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Clean end of a sequential stream (nothing left to read).
    #[error("end of stream")]
    Eof,

    #[error("failed to allocate {bytes} bytes for object")]
    AllocationFailure { bytes: u64 },

    /// Declared object length exceeds the configured ceiling.
    #[error("object length {len} exceeds limit {limit}")]
    ObjectTooLarge { len: u64, limit: u64 },

    /// A length cannot be expressed in the requested width, or on this host.
    #[error("length {value} cannot be represented with {width} encoding")]
    LengthOverflow { value: u64, width: WidthCode },

    #[error("corrupt attribute block: {0}")]
    CorruptAttributes(String),

    #[error("invalid object name: {0}")]
    InvalidName(String),

    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// Free regions must be at least one chunk and chunk aligned.
    #[error("invalid free region length {0}: must be >= 8 and a multiple of 8")]
    InvalidFreeLength(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Db5Error {
    pub(crate) fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            offset,
            reason: reason.into(),
        }
    }

    /// True when the caller may keep reading sibling objects after this error.
    ///
    /// Only structural damage to the current record is local; I/O failures,
    /// allocation failures and unsupported features stop the whole read.
    pub fn is_object_local(&self) -> bool {
        matches!(
            self,
            Self::CorruptAttributes(_) | Self::InvalidName(_) | Self::InvalidAttribute(_)
        )
    }
}

/// Result alias for codec operations.
pub type Db5Result<T> = Result<T, Db5Error>;
