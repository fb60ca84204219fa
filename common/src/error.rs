//! Error types for shared value construction.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while building shared value types from caller input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// A date string was not a valid `YYYY-MM-DD` calendar date.
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The range ends before it starts.
    #[error("End date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    /// Pagination options out of bounds.
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),
}

impl CommonError {
    /// Get error code for caller-facing responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            CommonError::InvalidDate(_) => "INVALID_DATE",
            CommonError::EndBeforeStart { .. } => "END_BEFORE_START",
            CommonError::InvalidPagination(_) => "INVALID_PAGINATION",
        }
    }
}

/// Result type alias for shared value construction.
pub type Result<T> = std::result::Result<T, CommonError>;
