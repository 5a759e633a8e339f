//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit code after the
//! error envelope is written.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::executor::{ExecutorError, ExecutorErrorCode};
use crate::planner::PlannerError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (files, stdout)
    IoError,
    /// Data file or filter could not be used
    InvalidInput,
    /// Async runtime could not start
    RuntimeFailed,
    /// The query itself failed
    Query(ExecutorErrorCode),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "AERO_CLI_CONFIG_ERROR",
            Self::IoError => "AERO_CLI_IO_ERROR",
            Self::InvalidInput => "AERO_CLI_INVALID_INPUT",
            Self::RuntimeFailed => "AERO_CLI_RUNTIME_FAILED",
            Self::Query(code) => code.code(),
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Unusable data file or filter
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidInput, msg)
    }

    /// Runtime failed to start
    pub fn runtime_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::RuntimeFailed, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<PlannerError> for CliError {
    fn from(e: PlannerError) -> Self {
        Self::invalid_input(format!("{}: {}", e.code(), e))
    }
}

impl From<ExecutorError> for CliError {
    fn from(e: ExecutorError) -> Self {
        Self::new(CliErrorCode::Query(e.code()), e.message())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
