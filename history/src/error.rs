//! History engine error types.

use fxhistory_common::CommonError;
use thiserror::Error;

/// Errors that can occur in the history engine.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Unparseable date, reversed range, or range too long.
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Pagination options out of bounds, or an empty collection handed to the page store.
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    /// Remote rate provider failed.
    #[error("Rate provider {provider} unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    /// Cache backend unreachable or failing.
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Requested page exceeds the stored page count.
    #[error("Page {requested} out of range, {total} pages available")]
    PageOutOfRange { requested: u32, total: u32 },

    /// Provider id not present in the registry.
    #[error("Unknown rate provider: {0}")]
    UnknownProvider(String),

    /// A value could not be encoded for the cache.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl HistoryError {
    /// Create a provider failure.
    pub fn provider(provider: impl Into<String>, message: impl ToString) -> Self {
        HistoryError::ProviderUnavailable {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Check if this error is an infrastructure failure the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HistoryError::ProviderUnavailable { .. } | HistoryError::CacheUnavailable(_)
        )
    }

    /// Check if this error was caused by the caller's input.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            HistoryError::InvalidRange(_)
                | HistoryError::InvalidPagination(_)
                | HistoryError::PageOutOfRange { .. }
        )
    }

    /// Get error code for caller-facing responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            HistoryError::InvalidRange(_) => "INVALID_RANGE",
            HistoryError::InvalidPagination(_) => "INVALID_PAGINATION",
            HistoryError::ProviderUnavailable { .. } => "PROVIDER_UNAVAILABLE",
            HistoryError::CacheUnavailable(_) => "CACHE_UNAVAILABLE",
            HistoryError::PageOutOfRange { .. } => "PAGE_OUT_OF_RANGE",
            HistoryError::UnknownProvider(_) => "UNKNOWN_PROVIDER",
            HistoryError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl From<CommonError> for HistoryError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::InvalidPagination(msg) => HistoryError::InvalidPagination(msg),
            other => HistoryError::InvalidRange(other.to_string()),
        }
    }
}

/// Result type for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(HistoryError::provider("frankfurter", "timeout").is_retryable());
        assert!(HistoryError::CacheUnavailable("down".into()).is_retryable());
        assert!(!HistoryError::InvalidRange("x".into()).is_retryable());
        assert!(!HistoryError::PageOutOfRange { requested: 4, total: 3 }.is_retryable());
    }

    #[test]
    fn test_common_error_mapping() {
        let err: HistoryError = CommonError::InvalidDate("2024-13-01".into()).into();
        assert_eq!(err.error_code(), "INVALID_RANGE");
        assert!(err.is_caller_error());

        let err: HistoryError = CommonError::InvalidPagination("page".into()).into();
        assert_eq!(err.error_code(), "INVALID_PAGINATION");
    }
}
