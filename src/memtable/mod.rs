//! MemTable Module
//!
//! In-memory data structure for recent writes.
//!
//! ## Responsibilities
//! - Fast upserts and lookups in memory
//! - Tombstones that shadow older on-disk values
//! - Track size for flush triggers
//! - Ordered iteration for segment creation
//!
//! ## Data Structure Choice
//! A plain `BTreeMap` with no lock of its own. The engine owns the only
//! mutable reference; once a memtable is handed to a flush it is frozen
//! behind an `Arc` and only read.

mod table;

pub use table::MemTable;
