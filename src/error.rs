//! Error types for emberkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using EmberError
pub type Result<T> = std::result::Result<T, EmberError>;

/// Unified error type for emberkv operations
#[derive(Debug, Error)]
pub enum EmberError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    /// A log record failed to decode (bad terminator, flag, reserved bytes,
    /// or a truncated stream).
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// A segment index file could not be parsed or is not strictly ordered.
    #[error("Corrupt segment index: {0}")]
    CorruptIndex(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EmberError {
    /// Whether this error indicates damaged on-disk data rather than an
    /// environmental failure.
    pub fn is_corruption(&self) -> bool {
        matches!(self, EmberError::CorruptRecord(_) | EmberError::CorruptIndex(_))
    }
}

impl From<serde_json::Error> for EmberError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            EmberError::Io(e.into())
        } else {
            EmberError::CorruptIndex(e.to_string())
        }
    }
}
