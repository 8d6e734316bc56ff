//! Storage Manager
//!
//! Owns the segment directory: naming, discovery and creation of segments.
//!
//! ## Responsibilities
//! - Discover existing segments on startup (newest → oldest)
//! - Hand out prefixes whose lexicographic order equals flush order
//! - Write a MemTable out as a new segment, cleaning up on failure

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::codec::LogEntry;
use crate::config::Config;
use crate::error::Result;
use crate::memtable::MemTable;

use super::segment::{
    format_prefix, index_path, parse_prefix, Segment, SegmentBuilder, LOG_EXTENSION,
    TEMP_EXTENSION,
};

/// Manages the on-disk side of the engine
///
/// Holds no segments itself; the engine owns the live list.
pub struct StorageManager {
    /// Directory where segment artifacts are stored
    data_dir: PathBuf,

    /// Sampling interval for newly built segments
    index_interval: usize,

    /// fsync new segments before handing them out
    sync_on_flush: bool,

    /// Highest prefix seen or handed out
    last_prefix: Mutex<u128>,
}

impl StorageManager {
    /// Open or create storage in the configured directory
    pub fn open(config: &Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        Ok(Self {
            data_dir: config.data_dir.clone(),
            index_interval: config.index_interval,
            sync_on_flush: config.sync_on_flush,
            last_prefix: Mutex::new(0),
        })
    }

    /// Load every complete segment in the directory, newest first
    ///
    /// A `.log` without its `.index` is what a crash mid-flush leaves behind;
    /// such logs are skipped, never loaded half-indexed.
    pub fn discover(&self) -> Result<Vec<Arc<Segment>>> {
        let mut prefixes: Vec<(u128, String)> = Vec::new();

        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }

            let extension = path.extension().and_then(|e| e.to_str());
            if extension == Some(TEMP_EXTENSION) {
                warn!(path = %path.display(), "ignoring unfinished segment index");
                continue;
            }
            if extension != Some(LOG_EXTENSION) {
                continue;
            }

            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem,
                None => continue,
            };
            let seq = match parse_prefix(stem) {
                Some(seq) => seq,
                None => continue,
            };

            if !index_path(&self.data_dir, stem).is_file() {
                warn!(prefix = stem, "segment log has no index, skipping");
                continue;
            }

            prefixes.push((seq, stem.to_string()));
        }

        // Fixed-width names: numeric order is lexicographic order
        prefixes.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        if let Some((newest, _)) = prefixes.first() {
            let mut last = self.last_prefix.lock();
            *last = (*last).max(*newest);
        }

        let mut segments = Vec::with_capacity(prefixes.len());
        for (_, prefix) in &prefixes {
            let segment = Segment::open(&self.data_dir, prefix)?;
            debug!(
                prefix = %prefix,
                entries = segment.entry_count(),
                interval = segment.index_interval(),
                "loaded segment"
            );
            segments.push(Arc::new(segment));
        }

        Ok(segments)
    }

    /// Next segment prefix: the current time in nanoseconds, bumped past the
    /// newest known prefix if the clock has not moved forward
    pub fn next_prefix(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let mut last = self.last_prefix.lock();
        let seq = if now > *last { now } else { *last + 1 };
        *last = seq;
        format_prefix(seq)
    }

    /// Write a MemTable out as a new segment
    ///
    /// On error nothing of the new segment remains on disk.
    pub fn write_segment(&self, memtable: &MemTable) -> Result<Segment> {
        let prefix = self.next_prefix();
        self.write_entries(&prefix, memtable.entries().map(|(_, entry)| entry))
    }

    /// Build a segment under `prefix` from entries in ascending key order
    pub fn write_entries<'a, I>(&self, prefix: &str, entries: I) -> Result<Segment>
    where
        I: IntoIterator<Item = &'a LogEntry>,
    {
        let mut builder = SegmentBuilder::create(
            &self.data_dir,
            prefix,
            self.index_interval,
            self.sync_on_flush,
        )?;

        for entry in entries {
            if let Err(e) = builder.add(entry) {
                if let Err(cleanup) = builder.abort() {
                    warn!(prefix, error = %cleanup, "failed to remove aborted segment");
                }
                return Err(e);
            }
        }

        builder.finish()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn index_interval(&self) -> usize {
        self.index_interval
    }
}
