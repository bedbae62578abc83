//! Attribute-value sets and their NUL-delimited wire form.
//!
//! Wire format: `name1\0value1\0 ... nameN\0valueN\0\0`. The final empty name
//! terminates the list. An empty set has no wire form at all; the object
//! simply omits its attribute part.

use indexmap::IndexMap;

use crate::error::{Db5Error, Db5Result};

/// Ordered name → value mapping attached to a database object.
///
/// Names are unique. Insertion order is kept so that exporting the same set
/// always produces the same bytes; equality ignores order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeSet {
    entries: IndexMap<String, String>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `name`. Returns the previous value, if any.
    ///
    /// Names must be non-empty and neither names nor values may contain NUL,
    /// since either would corrupt the wire form.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Db5Result<Option<String>> {
        let name = name.into();
        let value = value.into();
        if name.is_empty() {
            return Err(Db5Error::InvalidAttribute("empty attribute name".into()));
        }
        if name.contains('\0') {
            return Err(Db5Error::InvalidAttribute(format!("name {name:?} contains NUL")));
        }
        if value.contains('\0') {
            return Err(Db5Error::InvalidAttribute(format!(
                "value of {name:?} contains NUL"
            )));
        }
        Ok(self.insert_unchecked(name, value))
    }

    /// Build a set from pairs, failing on the first pair `insert` rejects.
    pub fn try_from_pairs<I, K, V>(pairs: I) -> Db5Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut set = Self::new();
        for (name, value) in pairs {
            set.insert(name, value)?;
        }
        Ok(set)
    }

    fn insert_unchecked(&mut self, name: String, value: String) -> Option<String> {
        // An existing name keeps its slot.
        self.entries.insert(name, value)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Remove `name`, keeping the order of the remaining entries.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Fold `overlay` into `self`; overlay values win on conflict.
    pub fn merge(&mut self, overlay: AttributeSet) {
        for (name, value) in overlay.entries {
            self.insert_unchecked(name, value);
        }
    }

    /// Serialize to the wire form. An empty set yields no bytes.
    pub fn export(&self) -> Vec<u8> {
        if self.entries.is_empty() {
            return Vec::new();
        }
        let size: usize = self.entries.iter().map(|(n, v)| n.len() + v.len() + 2).sum();
        let mut out = Vec::with_capacity(size + 1);
        for (name, value) in &self.entries {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
            out.extend_from_slice(value.as_bytes());
            out.push(0);
        }
        out.push(0);
        out
    }

    /// Parse the wire form.
    ///
    /// Never reads past `bytes`; a blob that ends before its terminating
    /// empty name is reported as corrupt.
    pub fn import(bytes: &[u8]) -> Db5Result<Self> {
        let mut set = Self::new();
        let mut pos = 0;
        loop {
            let name = next_cstr(bytes, &mut pos)
                .ok_or_else(|| Db5Error::CorruptAttributes("missing list terminator".into()))?;
            if name.is_empty() {
                break;
            }
            let value = next_cstr(bytes, &mut pos).ok_or_else(|| {
                Db5Error::CorruptAttributes(format!(
                    "attribute {:?} has no value",
                    String::from_utf8_lossy(name)
                ))
            })?;
            set.insert_unchecked(utf8(name)?, utf8(value)?);
        }
        if pos != bytes.len() {
            return Err(Db5Error::CorruptAttributes(format!(
                "{} trailing bytes after list terminator",
                bytes.len() - pos
            )));
        }
        Ok(set)
    }
}

/// Read a NUL-terminated byte string starting at `*pos`, advancing past the NUL.
fn next_cstr<'a>(bytes: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    let rest = bytes.get(*pos..)?;
    let nul = rest.iter().position(|&b| b == 0)?;
    *pos += nul + 1;
    Some(&rest[..nul])
}

fn utf8(bytes: &[u8]) -> Db5Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Db5Error::CorruptAttributes(format!("attribute text is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color_set() -> AttributeSet {
        let mut avs = AttributeSet::new();
        avs.insert("color", "255/0/0").unwrap();
        avs.insert("region", "R").unwrap();
        avs
    }

    #[test]
    fn export_wire_form() {
        assert_eq!(color_set().export(), b"color\0255/0/0\0region\0R\0\0");
    }

    #[test]
    fn export_empty_is_empty() {
        assert!(AttributeSet::new().export().is_empty());
    }

    #[test]
    fn import_export_roundtrip() {
        let avs = color_set();
        assert_eq!(AttributeSet::import(&avs.export()).unwrap(), avs);
    }

    #[test]
    fn import_empty_value() {
        let avs = AttributeSet::import(b"name\0\0\0").unwrap();
        assert_eq!(avs.get("name"), Some(""));
    }

    #[test]
    fn import_lone_terminator_is_empty_set() {
        assert!(AttributeSet::import(b"\0").unwrap().is_empty());
    }

    #[test]
    fn import_missing_final_terminator() {
        let err = AttributeSet::import(b"color\0255/0/0\0").unwrap_err();
        assert!(matches!(err, Db5Error::CorruptAttributes(_)));
    }

    #[test]
    fn import_unterminated_value() {
        let err = AttributeSet::import(b"color\0255/0/0").unwrap_err();
        assert!(matches!(err, Db5Error::CorruptAttributes(_)));
    }

    #[test]
    fn import_empty_slice_is_corrupt() {
        assert!(AttributeSet::import(b"").is_err());
    }

    #[test]
    fn import_never_reads_past_slice() {
        // The terminator lives just beyond the slice handed to import.
        let backing = b"a\0b\0\0";
        assert!(AttributeSet::import(&backing[..4]).is_err());
        assert!(AttributeSet::import(&backing[..]).is_ok());
    }

    #[test]
    fn import_rejects_trailing_garbage() {
        assert!(AttributeSet::import(b"a\0b\0\0junk").is_err());
    }

    #[test]
    fn import_duplicate_names_last_wins() {
        let avs = AttributeSet::import(b"a\x001\0a\x002\0\0").unwrap();
        assert_eq!(avs.len(), 1);
        assert_eq!(avs.get("a"), Some("2"));
    }

    #[test]
    fn merge_overlay_wins() {
        let mut base = color_set();
        let mut overlay = AttributeSet::new();
        overlay.insert("color", "0/255/0").unwrap();
        overlay.insert("material", "steel").unwrap();
        base.merge(overlay);

        assert_eq!(base.len(), 3);
        assert_eq!(base.get("color"), Some("0/255/0"));
        assert_eq!(base.get("region"), Some("R"));
        assert_eq!(base.get("material"), Some("steel"));
        // Overwrites keep the original slot.
        assert_eq!(base.iter().next(), Some(("color", "0/255/0")));
    }

    #[test]
    fn insert_rejects_bad_text() {
        let mut avs = AttributeSet::new();
        assert!(avs.insert("", "x").is_err());
        assert!(avs.insert("a\0b", "x").is_err());
        assert!(avs.insert("a", "x\0").is_err());
        assert!(avs.is_empty());
    }

    #[test]
    fn equality_ignores_order() {
        let a = AttributeSet::try_from_pairs([("x", "1"), ("y", "2")]).unwrap();
        let b = AttributeSet::try_from_pairs([("y", "2"), ("x", "1")]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.export(), b.export());
    }

    #[test]
    fn try_from_pairs_rejects_invalid_pair() {
        let err = AttributeSet::try_from_pairs([("ok", "1"), ("", "x")]).unwrap_err();
        assert!(matches!(err, Db5Error::InvalidAttribute(_)));
    }

    #[test]
    fn import_large_blob() {
        let n = 50_000;
        let mut blob = Vec::new();
        for i in 0..n {
            blob.extend_from_slice(format!("attr{i}\0v{i}\0").as_bytes());
        }
        blob.push(0);

        let avs = AttributeSet::import(&blob).unwrap();
        assert_eq!(avs.len(), n);
        assert_eq!(avs.get("attr0"), Some("v0"));
        assert_eq!(avs.get("attr49999"), Some("v49999"));
        assert_eq!(avs.export(), blob);

        let mut merged = avs.clone();
        merged.merge(avs);
        assert_eq!(merged.len(), n);
    }

    #[test]
    fn remove_keeps_order() {
        let mut avs = AttributeSet::try_from_pairs([("a", "1"), ("b", "2"), ("c", "3")]).unwrap();
        avs.remove("a");
        assert_eq!(avs.export(), b"b\x002\0c\x003\0\0");
    }

    #[test]
    fn remove_entry() {
        let mut avs = color_set();
        assert_eq!(avs.remove("color"), Some("255/0/0".to_string()));
        assert!(!avs.contains("color"));
        assert_eq!(avs.remove("color"), None);
    }
}
