//! Error types for AtlasKV filters
//!
//! Provides a unified error type for training, encoding and decoding.

use thiserror::Error;

/// Result type alias using FilterError
pub type Result<T> = std::result::Result<T, FilterError>;

/// Unified error type for filter operations
#[derive(Debug, Error)]
pub enum FilterError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Decoding Errors
    // -------------------------------------------------------------------------
    #[error("Truncated filter data: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Corrupted filter block: {0}")]
    Corrupted(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Training Errors
    // -------------------------------------------------------------------------
    #[error("Invalid training set: {0}")]
    InvalidTrainingSet(String),

    #[error("Block index went backwards: {next} appended after {previous}")]
    OutOfOrder { previous: u32, next: u32 },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for FilterError {
    fn from(e: bincode::Error) -> Self {
        FilterError::Serialization(e.to_string())
    }
}
