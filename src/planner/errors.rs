//! Planner error types
//!
//! Raised only while decoding a filter. Option normalization never fails.

use thiserror::Error;

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Filter decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlannerError {
    /// Malformed filter structure
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Operator not supported by the filter decoder
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// Operand of the wrong shape for its operator
    #[error("Invalid operand for {0}")]
    InvalidOperand(String),
}

impl PlannerError {
    /// Returns the string code in the AERO_* family
    pub fn code(&self) -> &'static str {
        match self {
            PlannerError::InvalidFilter(_) => "AERO_QUERY_INVALID",
            PlannerError::UnknownOperator(_) => "AERO_QUERY_UNKNOWN_OPERATOR",
            PlannerError::InvalidOperand(_) => "AERO_QUERY_INVALID_OPERAND",
        }
    }
}
