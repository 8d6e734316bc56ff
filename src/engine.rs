//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Route writes to the active MemTable
//! - Merge reads across active MemTable, flushing MemTable and segments
//! - Run the flush state machine without blocking readers during I/O
//! - Rediscover segments on startup

use std::fmt;
use std::mem;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::codec::{LogEntry, MAX_FIELD_LEN};
use crate::config::Config;
use crate::error::{EmberError, Result};
use crate::memtable::MemTable;
use crate::storage::{Segment, StorageManager};

/// Where a flush currently is
///
/// `Idle → Swapping → Writing → Installing → Idle`, or `Writing → Idle` when
/// the segment write fails. Swapping and Installing begin and end under one
/// hold of the exclusive state lock, so `flush_phase()` and `stats()` only
/// ever report `Idle` or `Writing`. Every transition is logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPhase {
    Idle,
    Swapping,
    Writing,
    Installing,
}

impl fmt::Display for FlushPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlushPhase::Idle => "idle",
            FlushPhase::Swapping => "swapping",
            FlushPhase::Writing => "writing",
            FlushPhase::Installing => "installing",
        };
        f.write_str(name)
    }
}

impl FlushPhase {
    /// Whether a flush may move from `self` to `next`
    pub fn can_enter(self, next: FlushPhase) -> bool {
        use FlushPhase::*;
        matches!(
            (self, next),
            (Idle, Swapping)
                | (Swapping, Writing)
                | (Writing, Installing)
                | (Writing, Idle)
                | (Installing, Idle)
        )
    }
}

/// Snapshot of engine counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub memtable_entries: usize,
    pub memtable_bytes: usize,
    pub flushing_entries: usize,
    pub segment_count: usize,
    pub flush_phase: FlushPhase,
}

/// Everything guarded by the state lock
struct EngineState {
    /// Receives every put/delete
    active: MemTable,

    /// Frozen table being written out; `Some` only during a flush
    flushing: Option<Arc<MemTable>>,

    /// Newest first
    segments: Vec<Arc<Segment>>,

    phase: FlushPhase,
}

impl EngineState {
    fn enter_phase(&mut self, next: FlushPhase) {
        debug_assert!(
            self.phase.can_enter(next),
            "illegal flush transition {} -> {}",
            self.phase,
            next
        );
        debug!(from = %self.phase, to = %next, "flush phase");
        self.phase = next;
    }
}

/// The main storage engine
///
/// ## Concurrency Model
///
/// - **State lock** (`RwLock<EngineState>`): guards the active MemTable, the
///   flushing slot and the segment list together.
///   - `get` takes it shared; any number of readers run at once
///   - `put`/`delete` take it exclusive for the in-memory update only
///   - `flush` takes it exclusive twice, briefly: to swap and to install
///
/// - **Flush lock** (`Mutex<()>`): serializes flushes, so there is never
///   more than one flushing MemTable.
///
/// Writing a segment holds no state lock. The flushing MemTable is frozen
/// behind an `Arc` and stays readable for the whole write.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Segment naming, discovery and building
    storage: StorageManager,

    state: RwLock<EngineState>,

    flush_lock: Mutex<()>,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// Segments found on disk are loaded newest first. Anything that was in a
    /// MemTable when the previous process stopped without flushing is gone.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let storage = StorageManager::open(&config)?;
        let segments = storage.discover()?;

        info!(
            data_dir = %config.data_dir.display(),
            segments = segments.len(),
            index_interval = config.index_interval,
            "engine opened"
        );

        Ok(Self {
            config,
            storage,
            state: RwLock::new(EngineState {
                active: MemTable::new(),
                flushing: None,
                segments,
                phase: FlushPhase::Idle,
            }),
            flush_lock: Mutex::new(()),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Get a value by key
    ///
    /// Search order, first hit wins:
    /// 1. Active MemTable
    /// 2. Flushing MemTable, if a flush is running
    /// 3. Segments (newest to oldest)
    ///
    /// A tombstone hit ends the search and reads as absent.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let state = self.state.read();

        if let Some(entry) = state.active.get(key) {
            return Ok(live_value(entry));
        }

        if let Some(flushing) = &state.flushing {
            if let Some(entry) = flushing.get(key) {
                return Ok(live_value(entry));
            }
        }

        for segment in &state.segments {
            if let Some(entry) = segment.get(key)? {
                return Ok(live_value(&entry));
            }
        }

        Ok(None)
    }

    /// Put a key-value pair
    ///
    /// May trigger an automatic flush; its error is returned, but the write
    /// itself is already applied.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        check_len("key", key)?;
        check_len("value", value)?;

        let size = self.state.write().active.put(key.to_vec(), value.to_vec());
        self.maybe_auto_flush(size)
    }

    /// Delete a key by writing a tombstone
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        check_len("key", key)?;

        let size = self.state.write().active.delete(key.to_vec());
        self.maybe_auto_flush(size)
    }

    /// Flush the active MemTable to a new segment
    ///
    /// Blocks while another flush finishes. A no-op when there is nothing to
    /// flush. On failure the unflushed entries are merged back into the
    /// active MemTable, so no write is lost or stranded.
    pub fn flush(&self) -> Result<()> {
        let _flush_guard = self.flush_lock.lock();
        self.flush_locked()
    }

    /// Flush any remaining data and close the engine
    pub fn close(self) -> Result<()> {
        self.flush()?;
        info!(data_dir = %self.config.data_dir.display(), "engine closed");
        Ok(())
    }

    // =========================================================================
    // Flush State Machine
    // =========================================================================

    fn maybe_auto_flush(&self, size: usize) -> Result<()> {
        let limit = match self.config.memtable_size_limit {
            Some(limit) if size >= limit => limit,
            _ => return Ok(()),
        };

        match self.flush_lock.try_lock() {
            Some(_flush_guard) => {
                debug!(size, limit, "memtable over limit, flushing");
                self.flush_locked()
            }
            // The running flush will be followed by another once this table
            // crosses the limit again
            None => Ok(()),
        }
    }

    /// Run all phases. Caller holds the flush lock.
    fn flush_locked(&self) -> Result<()> {
        let frozen = match self.begin_flush() {
            Some(frozen) => frozen,
            None => return Ok(()),
        };

        let started = Instant::now();
        match self.storage.write_segment(&frozen) {
            Ok(segment) => {
                info!(
                    prefix = segment.prefix(),
                    entries = segment.entry_count(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "flush complete"
                );
                self.install_segment(segment);
                Ok(())
            }
            Err(e) => {
                error!(
                    error = %e,
                    entries = frozen.len(),
                    "flush failed, merging entries back into active memtable"
                );
                self.abort_flush(&frozen);
                Err(e)
            }
        }
    }

    /// Swapping: freeze the active MemTable into the flushing slot
    fn begin_flush(&self) -> Option<Arc<MemTable>> {
        let mut state = self.state.write();
        if state.active.is_empty() {
            return None;
        }
        debug_assert!(state.flushing.is_none(), "flush lock not held");

        state.enter_phase(FlushPhase::Swapping);
        let frozen = Arc::new(mem::take(&mut state.active));
        state.flushing = Some(Arc::clone(&frozen));
        state.enter_phase(FlushPhase::Writing);

        debug!(entries = frozen.len(), "flush: memtable swapped");
        Some(frozen)
    }

    /// Installing: publish the segment and clear the flushing slot
    fn install_segment(&self, segment: Segment) {
        let mut state = self.state.write();
        state.enter_phase(FlushPhase::Installing);
        state.segments.insert(0, Arc::new(segment));
        state.flushing = None;
        state.enter_phase(FlushPhase::Idle);
    }

    /// Writing failed: fold the frozen entries back under any newer writes
    fn abort_flush(&self, frozen: &MemTable) {
        let mut state = self.state.write();
        state.active.merge_older(frozen);
        state.flushing = None;
        state.enter_phase(FlushPhase::Idle);
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        self.storage.data_dir()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the number of segments
    pub fn segment_count(&self) -> usize {
        self.state.read().segments.len()
    }

    /// Get the active memtable entry count, tombstones included
    pub fn memtable_entry_count(&self) -> usize {
        self.state.read().active.len()
    }

    /// Get the active memtable size in bytes
    pub fn memtable_size(&self) -> usize {
        self.state.read().active.approximate_size()
    }

    pub fn flush_phase(&self) -> FlushPhase {
        self.state.read().phase
    }

    pub fn stats(&self) -> EngineStats {
        let state = self.state.read();
        EngineStats {
            memtable_entries: state.active.len(),
            memtable_bytes: state.active.approximate_size(),
            flushing_entries: state.flushing.as_ref().map_or(0, |m| m.len()),
            segment_count: state.segments.len(),
            flush_phase: state.phase,
        }
    }
}

fn live_value(entry: &LogEntry) -> Option<Vec<u8>> {
    entry.live_value().map(<[u8]>::to_vec)
}

/// Refuse writes the codec could not persist, before they reach a MemTable
fn check_len(name: &str, field: &[u8]) -> Result<()> {
    if field.len() >= MAX_FIELD_LEN as usize {
        return Err(EmberError::Storage(format!(
            "{} of {} bytes exceeds the {} byte limit",
            name,
            field.len(),
            MAX_FIELD_LEN - 1
        )));
    }
    Ok(())
}
