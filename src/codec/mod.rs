//! Codec Module
//!
//! Binary record format shared by every segment log.
//!
//! ## Responsibilities
//! - Serialize one `LogEntry` to a byte stream
//! - Deserialize one `LogEntry` from a byte stream, rejecting malformed input
//! - Report exact record sizes so writers can track offsets
//!
//! ## Record Format (little-endian)
//! ```text
//! ┌───────────┬───────────────┬───────────┬─────────────────┬─────────┬──────────┐
//! │ KLen (4)  │ Key ... │ 0x00│ VLen (4)  │ Value ... │ 0x00│ Del (1) │ Rsv (2)  │
//! └───────────┴───────────────┴───────────┴─────────────────┴─────────┴──────────┘
//!   KLen = len(key) + 1        VLen = len(value) + 1          0|1       0x0000
//! ```
//!
//! Lengths are authoritative: keys and values may contain zero bytes. The
//! trailing zero of each field is only checked, never scanned for.

mod entry;
mod record;

pub use entry::LogEntry;
pub use record::{decode, decode_next, encode, encoded_len, write_entry};

/// Size of each length prefix
pub const LEN_PREFIX_SIZE: usize = 4;

/// Bytes after the value field: deleted flag (1) + reserved (2)
pub const TRAILER_SIZE: usize = 3;

/// Fixed per-record overhead: two prefixes, two terminators, the trailer
pub const RECORD_OVERHEAD: usize = 2 * LEN_PREFIX_SIZE + 2 + TRAILER_SIZE;

/// Largest accepted length prefix (field bytes plus terminator), 64 MB
pub const MAX_FIELD_LEN: u32 = 64 * 1024 * 1024;
