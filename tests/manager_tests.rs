//! Tests for StorageManager
//!
//! These tests verify:
//! - Opening/creating storage directories
//! - Writing MemTables out as segments
//! - Discovery order on restart (newest first)
//! - Skipping incomplete and foreign files

use std::fs;
use std::path::PathBuf;

use emberkv::config::Config;
use emberkv::memtable::MemTable;
use emberkv::storage::StorageManager;
use emberkv::{EmberError, LogEntry};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_storage() -> (TempDir, Config) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .index_interval(4)
        .sync_on_flush(false)
        .build();
    (temp_dir, config)
}

fn create_memtable_with_entries(entries: &[(&[u8], &[u8])]) -> MemTable {
    let mut memtable = MemTable::new();
    for (key, value) in entries {
        memtable.put(key.to_vec(), value.to_vec());
    }
    memtable
}

fn files_in(dir: &std::path::Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    files
}

// =============================================================================
// Open/Create Tests
// =============================================================================

#[test]
fn test_open_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("new_storage");
    let config = Config::builder().data_dir(&path).build();

    assert!(!path.exists());

    let manager = StorageManager::open(&config).unwrap();

    assert!(path.is_dir());
    assert_eq!(manager.data_dir(), path.as_path());
}

#[test]
fn test_open_empty_directory() {
    let (_temp, config) = setup_temp_storage();

    let manager = StorageManager::open(&config).unwrap();

    assert!(manager.discover().unwrap().is_empty());
}

// =============================================================================
// Segment Writing Tests
// =============================================================================

#[test]
fn test_write_segment_from_memtable() {
    let (_temp, config) = setup_temp_storage();
    let manager = StorageManager::open(&config).unwrap();

    let memtable = create_memtable_with_entries(&[
        (b"apple", b"red"),
        (b"banana", b"yellow"),
        (b"cherry", b"red"),
    ]);

    let segment = manager.write_segment(&memtable).unwrap();

    assert_eq!(segment.entry_count(), 3);
    assert_eq!(segment.index_interval(), 4);
    assert_eq!(segment.get(b"banana").unwrap().unwrap().value, b"yellow");
}

#[test]
fn test_write_segment_with_tombstones() {
    let (_temp, config) = setup_temp_storage();
    let manager = StorageManager::open(&config).unwrap();

    let mut memtable = MemTable::new();
    memtable.put(b"key1".to_vec(), b"value1".to_vec());
    memtable.delete(b"key2".to_vec());
    memtable.put(b"key3".to_vec(), b"value3".to_vec());

    let segment = manager.write_segment(&memtable).unwrap();

    assert_eq!(segment.entry_count(), 3); // Includes tombstone
    assert!(segment.get(b"key2").unwrap().unwrap().deleted);
}

#[test]
fn test_prefixes_strictly_increase() {
    let (_temp, config) = setup_temp_storage();
    let manager = StorageManager::open(&config).unwrap();

    let mut previous = manager.next_prefix();
    for _ in 0..100 {
        let next = manager.next_prefix();
        assert_eq!(next.len(), 24);
        assert!(next > previous, "{} should sort after {}", next, previous);
        previous = next;
    }
}

#[test]
fn test_unsorted_entries_leave_nothing_behind() {
    let (temp, config) = setup_temp_storage();
    let manager = StorageManager::open(&config).unwrap();

    let entries = [LogEntry::put("b", "1"), LogEntry::put("a", "2")];
    let prefix = manager.next_prefix();
    let result = manager.write_entries(&prefix, &entries);

    assert!(matches!(result, Err(EmberError::Storage(_))));
    assert!(files_in(temp.path()).is_empty());
}

// =============================================================================
// Discovery Tests
// =============================================================================

#[test]
fn test_discover_newest_first() {
    let (_temp, config) = setup_temp_storage();

    let written: Vec<String> = {
        let manager = StorageManager::open(&config).unwrap();
        (0..3)
            .map(|i| {
                let key = format!("key{}", i);
                let memtable = create_memtable_with_entries(&[(key.as_bytes(), b"v")]);
                manager.write_segment(&memtable).unwrap().prefix().to_string()
            })
            .collect()
    };

    let manager = StorageManager::open(&config).unwrap();
    let segments = manager.discover().unwrap();
    let found: Vec<&str> = segments.iter().map(|s| s.prefix()).collect();

    let mut expected = written.clone();
    expected.reverse();
    assert_eq!(found, expected);
}

#[test]
fn test_prefixes_continue_after_restart() {
    let (_temp, config) = setup_temp_storage();

    let manager = StorageManager::open(&config).unwrap();
    let memtable = create_memtable_with_entries(&[(b"k", b"v")]);
    let segment = manager.write_segment(&memtable).unwrap();

    // Pretend the newest segment came from a clock far in the future
    let future = "900000000000000000000000";
    fs::rename(segment.log_path(), config.data_dir.join(format!("{}.log", future))).unwrap();
    fs::rename(
        segment.index_path(),
        config.data_dir.join(format!("{}.index", future)),
    )
    .unwrap();
    drop(segment);

    let manager = StorageManager::open(&config).unwrap();
    let segments = manager.discover().unwrap();
    assert_eq!(segments[0].prefix(), future);

    assert!(manager.next_prefix().as_str() > future);
}

#[test]
fn test_discover_skips_log_without_index() {
    let (temp, config) = setup_temp_storage();
    let manager = StorageManager::open(&config).unwrap();

    let memtable = create_memtable_with_entries(&[(b"k", b"v")]);
    manager.write_segment(&memtable).unwrap();

    // Leftovers of a flush interrupted by a crash
    fs::write(temp.path().join("000000000000000000000001.log"), b"partial").unwrap();
    fs::write(
        temp.path().join("000000000000000000000002.index.tmp"),
        b"{",
    )
    .unwrap();

    let segments = manager.discover().unwrap();
    assert_eq!(segments.len(), 1);
}

#[test]
fn test_discover_ignores_foreign_files() {
    let (temp, config) = setup_temp_storage();
    let manager = StorageManager::open(&config).unwrap();

    fs::write(temp.path().join("notes.txt"), b"hello").unwrap();
    fs::write(temp.path().join("app.log"), b"not a segment").unwrap();
    fs::create_dir(temp.path().join("000000000000000000000003.log")).unwrap();

    assert!(manager.discover().unwrap().is_empty());
}

#[test]
fn test_discover_fails_on_corrupt_index() {
    let (_temp, config) = setup_temp_storage();
    let manager = StorageManager::open(&config).unwrap();

    let memtable = create_memtable_with_entries(&[(b"k", b"v")]);
    let segment = manager.write_segment(&memtable).unwrap();
    fs::write(segment.index_path(), b"[1, 2").unwrap();
    drop(segment);

    let result = manager.discover();
    assert!(matches!(result, Err(EmberError::CorruptIndex(_))));
}
