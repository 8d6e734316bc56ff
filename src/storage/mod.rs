//! Storage Module
//!
//! Persistent storage layer: immutable, sparse-indexed segments.
//!
//! ## Responsibilities
//! - Persist flushed MemTables as sorted record logs
//! - Bounded point lookups through a sparse in-memory index
//! - Discover segments left by earlier runs
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── 000001697040000000000000.log     records (codec format)
//!   ├── 000001697040000000000000.index   sparse index (JSON)
//!   ├── 000001697040000123456789.log
//!   └── 000001697040000123456789.index
//! ```
//! Prefixes are zero-padded nanosecond timestamps, so sorting names sorts
//! segments by flush time.

mod manager;
pub mod segment;

pub use manager::StorageManager;
pub use segment::{Segment, SegmentBuilder, SegmentIterator};
