//! # emberkv
//!
//! An embedded log-structured merge-tree key-value engine with:
//! - Ordered in-memory write buffer with tombstone deletes
//! - Immutable on-disk segments with a sparse index
//! - Flush that never blocks readers or writers during disk I/O
//! - Positioned segment reads with no shared file cursor
//!
//! ## Architecture Overview
//!
//! ```text
//!        put / delete                 get
//!             │                        │
//! ┌───────────▼────────────────────────▼────────────────────────┐
//! │                         Engine                               │
//! │          RwLock<active, flushing, segments>                  │
//! └───────────┬────────────────────────┬────────────────────────┘
//!             │                        │ 1. active
//!             ▼                        │ 2. flushing
//!   ┌──────────────────┐   flush       │ 3. segments, newest first
//!   │ Active MemTable  │──swap──┐      │
//!   └──────────────────┘        ▼      │
//!                     ┌──────────────────┐
//!                     │ Flushing MemTable│ (frozen, Arc)
//!                     └────────┬─────────┘
//!                              │ codec records + sparse index
//!                              ▼
//!               ┌──────────────────────────────┐
//!               │ Segments  [newest ... oldest]│
//!               │  <prefix>.log  <prefix>.index│
//!               └──────────────────────────────┘
//! ```
//!
//! MemTable contents are not logged ahead of a flush; unflushed writes do
//! not survive a restart.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod memtable;
pub mod storage;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EmberError, Result};
pub use config::Config;
pub use codec::LogEntry;
pub use engine::{Engine, EngineStats, FlushPhase};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of emberkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
