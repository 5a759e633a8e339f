//! Executor error types
//!
//! Error codes:
//! - AERO_QUERY_STORE_FAULT (ERROR)
//! - AERO_QUERY_INDEX_FAULT (ERROR)
//! - AERO_DATA_CORRUPTION (FATAL)
//!
//! A lookup that finds nothing and an index that declines are not errors.
//! Only faults from the store or index engine reach the caller.

use std::fmt;

use crate::store::StoreError;

/// Severity levels for executor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Query failed but system is healthy
    Error,
    /// Stored data cannot be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Executor-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// Store could not serve a lookup or scan
    AeroQueryStoreFault,
    /// Index engine failed while producing references
    AeroQueryIndexFault,
    /// Stored record is unreadable (FATAL)
    AeroDataCorruption,
}

impl ExecutorErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::AeroQueryStoreFault => "AERO_QUERY_STORE_FAULT",
            ExecutorErrorCode::AeroQueryIndexFault => "AERO_QUERY_INDEX_FAULT",
            ExecutorErrorCode::AeroDataCorruption => "AERO_DATA_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            ExecutorErrorCode::AeroDataCorruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error type with full context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorError {
    /// Error code
    code: ExecutorErrorCode,
    /// Human-readable message
    message: String,
    /// Store key involved, if known
    key: Option<String>,
}

impl ExecutorError {
    /// Create a store fault error
    pub fn store_fault(reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::AeroQueryStoreFault,
            message: reason.into(),
            key: None,
        }
    }

    /// Create an index fault error
    pub fn index_fault(reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::AeroQueryIndexFault,
            message: reason.into(),
            key: None,
        }
    }

    /// Create a data corruption error (FATAL)
    pub fn data_corruption(key: impl Into<String>, reason: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            code: ExecutorErrorCode::AeroDataCorruption,
            message: format!("Data corruption at key '{}': {}", key, reason.into()),
            key: Some(key),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> ExecutorErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the store key if applicable
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for ExecutorError {}

impl From<StoreError> for ExecutorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Corrupted { key, reason } => Self::data_corruption(key, reason),
            StoreError::IndexFault(reason) => Self::index_fault(reason),
            other => Self::store_fault(other.to_string()),
        }
    }
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;
