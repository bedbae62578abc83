use serde::{Deserialize, Serialize};

/// Limits and filters for reading objects from a stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadConfig {
    /// Largest declared object length accepted before allocating a buffer.
    pub max_object_len: u64,
    /// Refuse streams that do not open with the database identity header.
    pub require_identity: bool,
    /// Yield free-storage objects instead of silently skipping them.
    pub include_free: bool,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            max_object_len: 1024 * 1024 * 1024, // 1 GiB
            require_identity: true,
            include_free: false,
        }
    }
}

impl ReadConfig {
    /// No length ceiling beyond what the allocator can provide.
    pub fn unbounded() -> Self {
        Self {
            max_object_len: u64::MAX,
            ..Self::default()
        }
    }
}
