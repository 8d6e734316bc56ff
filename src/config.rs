//! Configuration for emberkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{EmberError, Result};

/// Default number of records between two sparse index samples
pub const DEFAULT_INDEX_INTERVAL: usize = 10;

/// Main configuration for an emberkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding every segment artifact pair.
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── 000001697040000000000000.log    (records)
    ///     ├── 000001697040000000000000.index  (sparse index)
    ///     └── ...
    pub data_dir: PathBuf,

    /// fsync the log and index of every new segment before it is installed
    pub sync_on_flush: bool,

    // -------------------------------------------------------------------------
    // Segment Configuration
    // -------------------------------------------------------------------------
    /// Sample one index entry every N records when building a segment.
    /// Persisted per segment, so changing it only affects new segments.
    pub index_interval: usize,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Flush automatically once the active memtable reaches this many bytes.
    /// `None` disables auto flush; callers then flush explicitly.
    pub memtable_size_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./emberkv_data"),
            sync_on_flush: true,
            index_interval: DEFAULT_INDEX_INTERVAL,
            memtable_size_limit: Some(64 * 1024 * 1024), // 64 MB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.index_interval == 0 {
            return Err(EmberError::Config(
                "index_interval must be at least 1".to_string(),
            ));
        }
        if self.memtable_size_limit == Some(0) {
            return Err(EmberError::Config(
                "memtable_size_limit must be non-zero; use None to disable auto flush"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the sparse index interval for new segments
    pub fn index_interval(mut self, interval: usize) -> Self {
        self.config.index_interval = interval;
        self
    }

    /// Set the memtable size limit (in bytes) that triggers an automatic flush
    pub fn memtable_size_limit(mut self, size: usize) -> Self {
        self.config.memtable_size_limit = Some(size);
        self
    }

    /// Only flush when `Engine::flush` is called
    pub fn disable_auto_flush(mut self) -> Self {
        self.config.memtable_size_limit = None;
        self
    }

    /// Whether new segments are fsynced before being installed
    pub fn sync_on_flush(mut self, sync: bool) -> Self {
        self.config.sync_on_flush = sync;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
