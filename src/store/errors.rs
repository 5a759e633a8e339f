//! # Store Errors
//!
//! Faults raised by the underlying ordered store or by an index engine
//! while producing candidates. A missing document is not an error.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store and index faults
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store cannot serve reads
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// An entry failed validation on read
    #[error("Corrupted entry at key '{key}': {reason}")]
    Corrupted { key: String, reason: String },

    /// The index engine failed while streaming references
    #[error("Index fault: {0}")]
    IndexFault(String),
}

impl StoreError {
    /// Create a corruption error for a key
    pub fn corrupted(key: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::Corrupted {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
