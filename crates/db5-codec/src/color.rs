//! Region-id color table stored on the `_GLOBAL` object.
//!
//! The table lives in the `regionid_colortable` attribute as a run of
//! `{low high r g b} ` groups. Callers own the [`ColorTable`] and pass it in
//! explicitly; nothing here is process-wide.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::attributes::AttributeSet;
use crate::error::Db5Result;

pub const COLOR_TABLE_ATTRIBUTE: &str = "regionid_colortable";

/// Regions whose id falls in `low..=high` are drawn in `rgb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub low: i32,
    pub high: i32,
    pub rgb: [u8; 3],
}

impl ColorRange {
    pub fn contains(&self, region_id: i32) -> bool {
        self.low <= region_id && region_id <= self.high
    }
}

/// Ordered set of region-id ranges, sorted by `low`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorTable {
    ranges: Vec<ColorRange>,
}

impl ColorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a range. An existing range with the same bounds is recolored.
    pub fn add(&mut self, low: i32, high: i32, rgb: [u8; 3]) {
        if let Some(existing) = self
            .ranges
            .iter_mut()
            .find(|r| r.low == low && r.high == high)
        {
            existing.rgb = rgb;
            return;
        }
        let pos = self.ranges.partition_point(|r| r.low <= low);
        self.ranges.insert(pos, ColorRange { low, high, rgb });
    }

    /// Color of the first range containing `region_id`.
    pub fn lookup(&self, region_id: i32) -> Option<[u8; 3]> {
        self.ranges
            .iter()
            .find(|r| r.contains(region_id))
            .map(|r| r.rgb)
    }

    pub fn ranges(&self) -> &[ColorRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Add every `{low high r g b}` group in `text` to the table.
    ///
    /// Parsing stops quietly at the first group that is malformed or whose
    /// color components are out of range. Returns how many groups were added.
    pub fn import_str(&mut self, text: &str) -> usize {
        let mut added = 0;
        let mut rest = text;
        loop {
            let Some(open) = rest.find('{') else { break };
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else { break };
            let Some((low, high, rgb)) = parse_group(&after[..close]) else {
                break;
            };
            self.add(low, high, rgb);
            added += 1;
            rest = &after[close + 1..];
        }
        added
    }

    /// Load the table from an attribute set, if it carries one.
    pub fn import(&mut self, avs: &AttributeSet) -> usize {
        avs.get(COLOR_TABLE_ATTRIBUTE)
            .map(|text| self.import_str(text))
            .unwrap_or(0)
    }

    pub fn export_str(&self) -> String {
        let mut out = String::new();
        for r in &self.ranges {
            let _ = write!(out, "{{{} {} {} {} {}}} ", r.low, r.high, r.rgb[0], r.rgb[1], r.rgb[2]);
        }
        out
    }

    /// Store the table in `avs`. An empty table removes the attribute.
    pub fn export_to(&self, avs: &mut AttributeSet) -> Db5Result<()> {
        if self.ranges.is_empty() {
            avs.remove(COLOR_TABLE_ATTRIBUTE);
        } else {
            avs.insert(COLOR_TABLE_ATTRIBUTE, self.export_str())?;
        }
        Ok(())
    }
}

fn parse_group(group: &str) -> Option<(i32, i32, [u8; 3])> {
    let mut fields = group.split_whitespace();
    let low = fields.next()?.parse().ok()?;
    let high = fields.next()?.parse().ok()?;
    let mut rgb = [0u8; 3];
    for c in &mut rgb {
        *c = fields.next()?.parse().ok()?;
    }
    if fields.next().is_some() {
        return None;
    }
    Some((low, high, rgb))
}
