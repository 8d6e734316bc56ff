//! Tests for the record codec
//!
//! These tests verify:
//! - Several records written to a file decode back in order
//! - Keys and values containing zero bytes survive a round trip
//! - A damaged stream is reported as corruption, not as an I/O error

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Write};

use emberkv::codec::{self, LogEntry};
use emberkv::EmberError;
use tempfile::TempDir;

#[test]
fn test_file_stream_roundtrip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("records.log");

    let entries = vec![
        LogEntry::put("/home/user/file.1", "My file"),
        LogEntry::put("/home/user/file.2", "My file 2"),
        LogEntry::tombstone("/home/user/file.3"),
    ];

    {
        let mut writer = BufWriter::new(File::create(&path).unwrap());
        let mut total = 0;
        for entry in &entries {
            total += codec::write_entry(&mut writer, entry).unwrap();
        }
        writer.flush().unwrap();
        assert_eq!(total, entries.iter().map(codec::encoded_len).sum::<u64>());
    }

    let mut reader = BufReader::new(File::open(&path).unwrap());
    for expected in &entries {
        assert_eq!(&codec::decode(&mut reader).unwrap(), expected);
    }
    assert!(codec::decode_next(&mut reader).unwrap().is_none());
}

#[test]
fn test_embedded_zero_bytes_roundtrip() {
    let entry = LogEntry {
        key: vec![0, 0, 1, 0],
        value: vec![0; 32],
        deleted: false,
    };

    let bytes = codec::encode(&entry).unwrap();
    let decoded = codec::decode(&mut Cursor::new(bytes)).unwrap();

    assert_eq!(decoded, entry);
}

#[test]
fn test_tombstone_with_value_still_encodes() {
    let entry = LogEntry {
        key: b"k".to_vec(),
        value: b"ignored".to_vec(),
        deleted: true,
    };

    let bytes = codec::encode(&entry).unwrap();
    let decoded = codec::decode(&mut Cursor::new(bytes)).unwrap();

    assert!(decoded.deleted);
    assert_eq!(decoded.live_value(), None);
}

#[test]
fn test_garbage_is_corrupt_record() {
    let garbage = vec![0x05, 0, 0, 0, b'h', b'e', b'l', b'l', b'o'];

    let err = codec::decode(&mut Cursor::new(garbage)).unwrap_err();

    assert!(matches!(err, EmberError::CorruptRecord(_)));
    assert!(err.is_corruption());
}
