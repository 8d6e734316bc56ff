//! Segment Builder
//!
//! Streams sorted entries into a new segment log and samples the sparse index.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::codec::{self, LogEntry};
use crate::error::{EmberError, Result};

use super::{index_path, log_path, temp_index_path, IndexFile, Segment, INDEX_VERSION};

/// Builder for creating a new segment from entries in ascending key order
///
/// Dropping a builder before `finish()` removes whatever it wrote.
pub struct SegmentBuilder {
    prefix: String,
    log_path: PathBuf,
    index_path: PathBuf,
    temp_index_path: PathBuf,
    /// Taken in `finish`/`drop` so the file is closed before cleanup
    writer: Option<BufWriter<File>>,
    interval: usize,
    sync: bool,
    /// Offset where the next record starts
    current_offset: u64,
    entry_count: u64,
    index: Vec<(Vec<u8>, u64)>,
    last_key: Option<Vec<u8>>,
    finished: bool,
}

impl SegmentBuilder {
    /// Create `<prefix>.log` in `dir` and prepare to sample every
    /// `interval`th record
    pub fn create(dir: &Path, prefix: &str, interval: usize, sync: bool) -> Result<Self> {
        if interval == 0 {
            return Err(EmberError::Config(
                "index interval must be at least 1".to_string(),
            ));
        }

        let log_path = log_path(dir, prefix);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&log_path)?;

        Ok(Self {
            prefix: prefix.to_string(),
            log_path,
            index_path: index_path(dir, prefix),
            temp_index_path: temp_index_path(dir, prefix),
            writer: Some(BufWriter::new(file)),
            interval,
            sync,
            current_offset: 0,
            entry_count: 0,
            index: Vec::new(),
            last_key: None,
            finished: false,
        })
    }

    /// Append an entry. Keys must be strictly ascending.
    pub fn add(&mut self, entry: &LogEntry) -> Result<()> {
        if let Some(last) = &self.last_key {
            if entry.key.as_slice() <= last.as_slice() {
                return Err(EmberError::Storage(format!(
                    "segment {}: key {:?} is not greater than previous key {:?}",
                    self.prefix,
                    String::from_utf8_lossy(&entry.key),
                    String::from_utf8_lossy(last)
                )));
            }
        }

        let offset = self.current_offset;
        let written = codec::write_entry(self.writer_mut()?, entry)?;

        if self.entry_count % self.interval as u64 == 0 {
            self.index.push((entry.key.clone(), offset));
        }

        self.current_offset += written;
        self.entry_count += 1;
        self.last_key = Some(entry.key.clone());
        Ok(())
    }

    /// Number of entries added so far
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Finish building: write the index, make both files durable, and reopen
    /// the log for positioned reads
    pub fn finish(mut self) -> Result<Segment> {
        let mut writer = match self.writer.take() {
            Some(w) => w,
            None => return Err(closed_error(&self.prefix)),
        };
        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| EmberError::Storage(format!("Failed to flush segment log: {}", e)))?;
        if self.sync {
            file.sync_all()?;
        }
        drop(file);

        let index = IndexFile {
            version: INDEX_VERSION,
            interval: self.interval,
            entry_count: self.entry_count,
            entries: std::mem::take(&mut self.index),
        };
        self.write_index(&index)?;

        let segment = Segment::from_parts(
            self.prefix.clone(),
            self.log_path.clone(),
            self.index_path.clone(),
            index,
        )?;

        self.finished = true;
        debug!(
            prefix = %self.prefix,
            entries = self.entry_count,
            log_bytes = self.current_offset,
            "segment finished"
        );
        Ok(segment)
    }

    /// Discard the partially built segment and its files
    pub fn abort(mut self) -> Result<()> {
        self.writer.take();
        self.finished = true;
        remove_if_exists(&self.temp_index_path)?;
        remove_if_exists(&self.index_path)?;
        remove_if_exists(&self.log_path)?;
        Ok(())
    }

    /// Write the index under a temporary name and rename it into place
    fn write_index(&self, index: &IndexFile) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.temp_index_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, index)?;
        writer.flush()?;

        let file = writer
            .into_inner()
            .map_err(|e| EmberError::Storage(format!("Failed to flush segment index: {}", e)))?;
        if self.sync {
            file.sync_all()?;
        }
        drop(file);

        fs::rename(&self.temp_index_path, &self.index_path)?;
        Ok(())
    }

    fn writer_mut(&mut self) -> Result<&mut BufWriter<File>> {
        match self.writer.as_mut() {
            Some(w) => Ok(w),
            None => Err(closed_error(&self.prefix)),
        }
    }
}

impl Drop for SegmentBuilder {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.writer.take();
        for path in [&self.temp_index_path, &self.index_path, &self.log_path] {
            if let Err(e) = remove_if_exists(path) {
                warn!(path = %path.display(), error = %e, "failed to remove unfinished segment file");
            }
        }
    }
}

fn closed_error(prefix: &str) -> EmberError {
    EmberError::Storage(format!("segment {} builder already closed", prefix))
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
