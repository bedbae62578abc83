//! Database preamble: identity header plus the `_GLOBAL` object.
//!
//! Every v5 file starts with [`IDENTITY_HEADER`] and, immediately after it,
//! an attribute-only object named `_GLOBAL` that records the database title
//! and the local-units-to-millimetres factor.

use std::io::Write;

use tracing::debug;

use crate::attributes::AttributeSet;
use crate::crack::{crack_buffer, RawObject};
use crate::error::{Db5Error, Db5Result};
use crate::header::{is_identity_header, Dli, IDENTITY_HEADER};
use crate::object::{AssembledObject, ObjectBuilder};
use crate::types::MajorType;
use crate::update::update_object_attributes;

pub const GLOBAL_OBJECT_NAME: &str = "_GLOBAL";

const TITLE_ATTRIBUTE: &str = "title";
const UNITS_ATTRIBUTE: &str = "units";
const DEFAULT_TITLE: &str = "Untitled v5 BRL-CAD Database";

/// Database-wide settings carried by the `_GLOBAL` object.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalInfo {
    pub title: String,
    /// Multiply a local-unit value by this to get millimetres.
    pub local2mm: f64,
    /// Every attribute on `_GLOBAL`, including title and units.
    pub attributes: AttributeSet,
}

impl GlobalInfo {
    /// Read title and units from a cracked `_GLOBAL` object.
    ///
    /// Missing attributes fall back to an untitled, millimetre database.
    pub fn from_object<B: AsRef<[u8]>>(obj: &RawObject<B>) -> Db5Result<Self> {
        let name = obj.name()?;
        if name != Some(GLOBAL_OBJECT_NAME) {
            return Err(Db5Error::InvalidName(format!(
                "expected {GLOBAL_OBJECT_NAME}, found {name:?}"
            )));
        }
        let attributes = obj.attributes()?;
        let title = attributes.get(TITLE_ATTRIBUTE).unwrap_or(DEFAULT_TITLE).to_string();
        let local2mm = match attributes.get(UNITS_ATTRIBUTE) {
            Some(units) => units.trim().parse::<f64>().map_err(|e| {
                Db5Error::CorruptAttributes(format!("units {units:?} is not a number: {e}"))
            })?,
            None => 1.0,
        };
        Ok(Self {
            title,
            local2mm,
            attributes,
        })
    }
}

/// Assemble the `_GLOBAL` object for a new database.
pub fn global_object(title: &str, local2mm: f64) -> Db5Result<AssembledObject> {
    let mut avs = AttributeSet::new();
    avs.insert(TITLE_ATTRIBUTE, title)?;
    avs.insert(UNITS_ATTRIBUTE, format_units(local2mm))?;
    let blob = avs.export();
    ObjectBuilder::new(Dli::ApplicationData, MajorType::AttributeOnly, 0)
        .name(GLOBAL_OBJECT_NAME)
        .attributes(blob.as_slice())
        .build()
}

/// Write the identity header and `_GLOBAL` object. Returns bytes written.
pub fn write_ident<W: Write + ?Sized>(dst: &mut W, title: &str, local2mm: f64) -> Db5Result<u64> {
    let global = global_object(title, local2mm)?;
    dst.write_all(&IDENTITY_HEADER)?;
    dst.write_all(global.as_bytes())?;
    let written = (IDENTITY_HEADER.len() + global.len()) as u64;
    debug!(title, local2mm, written, "database identity written");
    Ok(written)
}

/// Parse the preamble at the start of a database image.
///
/// `bytes` must begin with the identity header followed by `_GLOBAL`.
pub fn read_ident(bytes: &[u8]) -> Db5Result<GlobalInfo> {
    if !is_identity_header(bytes) {
        return Err(Db5Error::malformed(0, "missing database identity header"));
    }
    let global = crack_buffer(&bytes[IDENTITY_HEADER.len()..])?;
    GlobalInfo::from_object(&global)
}

/// Rebuild an existing `_GLOBAL` object with a new title and units,
/// keeping any other attributes it carries.
pub fn update_ident(
    existing_global: &[u8],
    title: &str,
    local2mm: f64,
) -> Db5Result<AssembledObject> {
    let mut overlay = AttributeSet::new();
    overlay.insert(TITLE_ATTRIBUTE, title)?;
    overlay.insert(UNITS_ATTRIBUTE, format_units(local2mm))?;
    update_object_attributes(existing_global, None, overlay)
}

/// Format like C's `%.25e`: 25 fractional digits, signed two-digit exponent.
fn format_units(value: f64) -> String {
    let formatted = format!("{value:.25e}");
    match formatted.split_once('e') {
        Some((mantissa, exp)) => match exp.parse::<i32>() {
            Ok(exp) => format!("{mantissa}e{}{:02}", if exp < 0 { '-' } else { '+' }, exp.abs()),
            Err(_) => formatted,
        },
        None => formatted,
    }
}
