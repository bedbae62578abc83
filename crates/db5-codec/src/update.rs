//! Attribute edits on existing objects.
//!
//! There is no in-place edit: the object is cracked, its attribute set is
//! rebuilt, and a brand new object is assembled around the unchanged body.
//! The DLI, hidden flag and type codes of the original are preserved.

use tracing::debug;

use crate::attributes::AttributeSet;
use crate::crack::crack_buffer;
use crate::error::Db5Result;
use crate::object::{AssembledObject, ObjectBuilder};

/// Merge `overlay` into the object's attributes; overlay values win.
///
/// `name` renames the object when given; `None` keeps the existing name.
pub fn update_object_attributes(
    existing: &[u8],
    name: Option<&str>,
    overlay: AttributeSet,
) -> Db5Result<AssembledObject> {
    rebuild(existing, name, |mut avs| {
        avs.merge(overlay);
        avs
    })
}

/// Replace the object's attributes wholesale with `avs`.
pub fn replace_attributes(
    existing: &[u8],
    name: Option<&str>,
    avs: AttributeSet,
) -> Db5Result<AssembledObject> {
    rebuild(existing, name, |_| avs)
}

/// Set a single attribute, keeping all others.
pub fn update_attribute(
    existing: &[u8],
    attribute: &str,
    value: &str,
) -> Db5Result<AssembledObject> {
    let mut overlay = AttributeSet::new();
    overlay.insert(attribute, value)?;
    update_object_attributes(existing, None, overlay)
}

fn rebuild(
    existing: &[u8],
    name: Option<&str>,
    edit: impl FnOnce(AttributeSet) -> AttributeSet,
) -> Db5Result<AssembledObject> {
    let view = crack_buffer(existing)?;
    let header = *view.header();
    let avs = edit(view.attributes()?);
    let blob = avs.export();
    let name = match name {
        Some(n) => Some(n),
        None => view.name()?,
    };

    let updated = ObjectBuilder::new(header.dli, header.major_type, header.minor_type)
        .hidden(header.hidden)
        .name(name)
        .attributes(blob.as_slice())
        .body(view.body())
        .build()?;

    debug!(
        name = name.unwrap_or(""),
        attributes = avs.len(),
        old_len = view.object_len(),
        new_len = updated.len(),
        "object attributes rewritten"
    );
    Ok(updated)
}
