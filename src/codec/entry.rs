//! Log entry definition
//!
//! The single value type carried through memtables, segments and the codec.

/// One key-value record, live or deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub key: Vec<u8>,

    /// Irrelevant when `deleted` is set; tombstones carry an empty value
    pub value: Vec<u8>,

    pub deleted: bool,
}

impl LogEntry {
    /// A live entry
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            deleted: false,
        }
    }

    /// A tombstone shadowing any older value for `key`
    pub fn tombstone(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Vec::new(),
            deleted: true,
        }
    }

    /// The value, unless this entry is a tombstone
    pub fn live_value(&self) -> Option<&[u8]> {
        if self.deleted {
            None
        } else {
            Some(&self.value)
        }
    }

    /// Approximate in-memory footprint, used for flush thresholds
    pub fn size(&self) -> usize {
        self.key.len() + self.value.len()
    }
}
