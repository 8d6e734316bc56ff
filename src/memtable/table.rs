//! MemTable implementation
//!
//! BTreeMap-based memtable. Synchronization is the caller's job.

use std::collections::btree_map::{self, BTreeMap};

use crate::codec::LogEntry;

/// In-memory table for recent writes, keyed in byte order
#[derive(Debug, Default)]
pub struct MemTable {
    data: BTreeMap<Vec<u8>, LogEntry>,
    /// Sum of key and value lengths of the current entries
    size: usize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry for a key, live or tombstone
    pub fn get(&self, key: &[u8]) -> Option<&LogEntry> {
        self.data.get(key)
    }

    /// Upsert a live value. Returns the new approximate size.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> usize {
        self.insert(LogEntry::put(key, value))
    }

    /// Upsert a tombstone. The key stays in the table so it shadows older
    /// segments. Returns the new approximate size.
    pub fn delete(&mut self, key: Vec<u8>) -> usize {
        self.insert(LogEntry::tombstone(key))
    }

    fn insert(&mut self, entry: LogEntry) -> usize {
        self.size += entry.size();
        if let Some(old) = self.data.insert(entry.key.clone(), entry) {
            self.size -= old.size();
        }
        self.size
    }

    /// Fold in the entries of an older table. Keys already present here are
    /// newer and win.
    pub fn merge_older(&mut self, older: &MemTable) {
        for (key, entry) in older.entries() {
            if let btree_map::Entry::Vacant(slot) = self.data.entry(key.clone()) {
                self.size += entry.size();
                slot.insert(entry.clone());
            }
        }
    }

    /// Entries in ascending key order
    pub fn entries(&self) -> btree_map::Iter<'_, Vec<u8>, LogEntry> {
        self.data.iter()
    }

    /// Get approximate size in bytes
    pub fn approximate_size(&self) -> usize {
        self.size
    }

    /// Get entry count, tombstones included
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_overwrite_tracks_size() {
        let mut table = MemTable::new();
        assert_eq!(table.put(b"key".to_vec(), b"value".to_vec()), 8);
        assert_eq!(table.put(b"key".to_vec(), b"v".to_vec()), 4);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(b"key").unwrap().value, b"v");
    }

    #[test]
    fn test_delete_keeps_tombstone() {
        let mut table = MemTable::new();
        table.put(b"key".to_vec(), b"value".to_vec());
        assert_eq!(table.delete(b"key".to_vec()), 3);

        let entry = table.get(b"key").unwrap();
        assert!(entry.deleted);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_delete_absent_key_inserts_tombstone() {
        let mut table = MemTable::new();
        table.delete(b"ghost".to_vec());
        assert!(table.get(b"ghost").unwrap().deleted);
    }

    #[test]
    fn test_entries_ascending() {
        let mut table = MemTable::new();
        for key in ["m", "a", "z", "b"] {
            table.put(key.into(), b"v".to_vec());
        }
        let keys: Vec<&[u8]> = table.entries().map(|(k, _)| k.as_slice()).collect();
        assert_eq!(keys, vec![&b"a"[..], &b"b"[..], &b"m"[..], &b"z"[..]]);
    }

    #[test]
    fn test_merge_older_keeps_newer_values() {
        let mut older = MemTable::new();
        older.put(b"a".to_vec(), b"old".to_vec());
        older.put(b"b".to_vec(), b"old".to_vec());

        let mut newer = MemTable::new();
        newer.delete(b"a".to_vec());
        newer.merge_older(&older);

        assert!(newer.get(b"a").unwrap().deleted);
        assert_eq!(newer.get(b"b").unwrap().value, b"old");
        assert_eq!(newer.approximate_size(), 1 + 4);
    }
}
