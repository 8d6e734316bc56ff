//! Segment Module
//!
//! Immutable on-disk unit produced by one flush.
//!
//! ## Artifacts
//! ```text
//! {prefix}.log     concatenated codec records, strictly ascending keys
//!                  ┌──────────┬──────────┬──────────┬─────┐
//!                  │ record 0 │ record 1 │ record 2 │ ... │
//!                  └──────────┴──────────┴──────────┴─────┘
//!                  ▲                     ▲
//! {prefix}.index   (key0, 0)             (keyN, off_N)    ... every Nth record
//! ```
//!
//! The index file is JSON:
//! `{"version":1,"interval":N,"entry_count":C,"entries":[[key,offset],...]}`.
//! A lookup jumps to the greatest sampled key ≤ target and decodes at most
//! `interval` records from there.

mod builder;
mod iterator;
mod reader;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use builder::SegmentBuilder;
pub use iterator::SegmentIterator;
pub use reader::Segment;

// =============================================================================
// Shared Constants (used by builder, reader, manager)
// =============================================================================

/// Extension of the record log
pub(crate) const LOG_EXTENSION: &str = "log";

/// Extension of the sparse index
pub(crate) const INDEX_EXTENSION: &str = "index";

/// Extension of an index that has not been renamed into place yet
pub(crate) const TEMP_EXTENSION: &str = "tmp";

/// Width of the zero-padded decimal prefix
pub(crate) const PREFIX_WIDTH: usize = 24;

/// Current index file format version
pub(crate) const INDEX_VERSION: u32 = 1;

/// Buffer size for positioned lookups and scans
pub(crate) const READ_BUFFER_SIZE: usize = 4 * 1024;

// =============================================================================
// Index File
// =============================================================================

/// On-disk form of a segment's sparse index
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct IndexFile {
    pub version: u32,
    /// Records between samples; readers scan at most this many
    pub interval: usize,
    pub entry_count: u64,
    /// (sampled key, byte offset of its record), strictly ascending
    pub entries: Vec<(Vec<u8>, u64)>,
}

/// Format a flush sequence number as a segment prefix
pub(crate) fn format_prefix(seq: u128) -> String {
    format!("{:0width$}", seq, width = PREFIX_WIDTH)
}

/// Parse a segment prefix; only fixed-width decimal names qualify
pub(crate) fn parse_prefix(stem: &str) -> Option<u128> {
    if stem.len() != PREFIX_WIDTH || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

pub(crate) fn log_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{}.{}", prefix, LOG_EXTENSION))
}

pub(crate) fn index_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{}.{}", prefix, INDEX_EXTENSION))
}

pub(crate) fn temp_index_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{}.{}.{}", prefix, INDEX_EXTENSION, TEMP_EXTENSION))
}
