//! Error types for utxostore
//!
//! Provides a unified error type for all operations.
//!
//! Absence of a key is NOT an error: `find` returns `Ok(None)` and deferred
//! deletions that match nothing are reported as a normal outcome.

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for utxostore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Insert Errors
    // -------------------------------------------------------------------------
    #[error("value of {size} bytes exceeds the largest container capacity ({max} bytes)")]
    ValueTooLarge { size: usize, max: usize },

    #[error("key already exists")]
    DuplicateKey,

    // -------------------------------------------------------------------------
    // File Format Errors
    // -------------------------------------------------------------------------
    #[error("corrupt file: {0}")]
    Corrupt(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
