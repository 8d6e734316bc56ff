//! Segment Reader
//!
//! Point lookups through the in-memory sparse index and positioned reads.

use std::cmp::Ordering as KeyOrdering;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::codec::{self, LogEntry};
use crate::error::{EmberError, Result};

use super::iterator::SegmentIterator;
use super::{index_path, log_path, IndexFile, INDEX_VERSION, READ_BUFFER_SIZE};

/// An immutable, opened segment
///
/// Lookups never move a shared file cursor: every read names its offset, so
/// any number of threads can call `get` on one `Segment` at once.
#[derive(Debug)]
pub struct Segment {
    prefix: String,
    log_path: PathBuf,
    index_path: PathBuf,
    /// Read-only log handle, used only through positioned reads
    file: File,
    /// Sampled (key, offset) pairs, strictly ascending
    index: Vec<(Vec<u8>, u64)>,
    interval: usize,
    entry_count: u64,
    /// Positioned read calls issued against the log
    disk_reads: AtomicU64,
}

impl Segment {
    /// Open the segment `<prefix>.log` / `<prefix>.index` in `dir`
    pub fn open(dir: &Path, prefix: &str) -> Result<Self> {
        let index_path = index_path(dir, prefix);
        let index_file = File::open(&index_path)?;
        let index: IndexFile = serde_json::from_reader(BufReader::new(index_file))?;

        Self::from_parts(prefix.to_string(), log_path(dir, prefix), index_path, index)
    }

    /// Validate a loaded index and open the log it describes
    pub(super) fn from_parts(
        prefix: String,
        log_path: PathBuf,
        index_path: PathBuf,
        index: IndexFile,
    ) -> Result<Self> {
        if index.version != INDEX_VERSION {
            return Err(EmberError::CorruptIndex(format!(
                "segment {}: unsupported index version {}",
                prefix, index.version
            )));
        }
        if index.interval == 0 {
            return Err(EmberError::CorruptIndex(format!(
                "segment {}: index interval is zero",
                prefix
            )));
        }
        for pair in index.entries.windows(2) {
            if pair[0].0 >= pair[1].0 || pair[0].1 >= pair[1].1 {
                return Err(EmberError::CorruptIndex(format!(
                    "segment {}: index entries are not strictly ascending",
                    prefix
                )));
            }
        }

        let file = File::open(&log_path)?;

        // Every sampled offset must point at a record inside the log
        if let Some((_, last_offset)) = index.entries.last() {
            let log_len = file.metadata()?.len();
            if log_len <= *last_offset {
                return Err(EmberError::CorruptIndex(format!(
                    "segment {}: log is {} bytes but index points at offset {}",
                    prefix, log_len, last_offset
                )));
            }
        }

        Ok(Self {
            prefix,
            log_path,
            index_path,
            file,
            index: index.entries,
            interval: index.interval,
            entry_count: index.entry_count,
            disk_reads: AtomicU64::new(0),
        })
    }

    /// Look up a key
    ///
    /// Returns:
    /// - `Ok(Some(entry))`: key found, possibly a tombstone
    /// - `Ok(None)`: key not in this segment
    /// - `Err(CorruptRecord)`: the log could not be decoded
    pub fn get(&self, key: &[u8]) -> Result<Option<LogEntry>> {
        let offset = match self.seek_offset(key) {
            Some(off) => off,
            // Key sorts before every sampled key; no disk access needed
            None => return Ok(None),
        };

        let mut reader = self.reader_at(offset);
        for slot in 0..self.interval {
            let entry = match codec::decode_next(&mut reader)? {
                Some(entry) => entry,
                None if slot == 0 => {
                    return Err(EmberError::CorruptRecord(format!(
                        "segment {}: log ends at sampled offset {}",
                        self.prefix, offset
                    )))
                }
                None => return Ok(None), // log ended inside the last block
            };

            match entry.key.as_slice().cmp(key) {
                KeyOrdering::Equal => return Ok(Some(entry)),
                KeyOrdering::Greater => return Ok(None),
                KeyOrdering::Less => {}
            }
        }

        Ok(None)
    }

    /// Offset of the greatest sampled key ≤ `key`
    fn seek_offset(&self, key: &[u8]) -> Option<u64> {
        let idx = self.index.partition_point(|(k, _)| k.as_slice() <= key);
        if idx == 0 {
            None
        } else {
            Some(self.index[idx - 1].1)
        }
    }

    /// A private buffered cursor over the log starting at `offset`
    pub(super) fn reader_at(&self, offset: u64) -> BufReader<PositionedReader<'_>> {
        BufReader::with_capacity(
            READ_BUFFER_SIZE,
            PositionedReader {
                file: &self.file,
                pos: offset,
                reads: &self.disk_reads,
            },
        )
    }

    /// Iterate over every record in key order
    pub fn iter(&self) -> SegmentIterator<'_> {
        SegmentIterator::new(self.reader_at(0))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Records written into this segment, tombstones included
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Sampling interval this segment was built with
    pub fn index_interval(&self) -> usize {
        self.interval
    }

    /// Smallest key in the segment
    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.first().map(|(k, _)| k.as_slice())
    }

    /// Sampled keys in ascending order
    pub fn index_keys(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.index.iter().map(|(k, _)| k.as_slice())
    }

    /// Number of positioned reads issued so far
    pub fn disk_reads(&self) -> u64 {
        self.disk_reads.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Positioned Reads
// =============================================================================

/// `Read` over a shared file that tracks its own offset
pub struct PositionedReader<'a> {
    file: &'a File,
    pos: u64,
    reads: &'a AtomicU64,
}

impl Read for PositionedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let n = read_at(self.file, buf, self.pos)?;
        self.pos += n as u64;
        Ok(n)
    }
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::unix::fs::FileExt::read_at(file, buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::windows::fs::FileExt::seek_read(file, buf, offset)
}
