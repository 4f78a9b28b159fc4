//! Error taxonomy shared by the orchestrator, evaluator, engine and store
//!
//! Every variant is surfaced to callers as a distinct kind; nothing in the
//! core converts an error into a default value.

/// Result type alias for suite operations
pub type Result<T> = std::result::Result<T, SuiteError>;

/// Unified error type for the performance suite core
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SuiteError {
    /// Bad caller input, never retried automatically
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A run is already active
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown run id or no matching run
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not valid for the run's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Too few samples to produce a verdict or recommendation
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The sample store could not be reached
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl SuiteError {
    /// Stable machine-readable kind reported to API clients
    pub fn kind(&self) -> &'static str {
        match self {
            SuiteError::Validation(_) => "validation_error",
            SuiteError::Conflict(_) => "conflict_error",
            SuiteError::NotFound(_) => "not_found_error",
            SuiteError::InvalidState(_) => "invalid_state_error",
            SuiteError::InsufficientData(_) => "insufficient_data_error",
            SuiteError::StorageUnavailable(_) => "storage_unavailable_error",
        }
    }

    /// Only storage failures are eligible for automatic retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, SuiteError::StorageUnavailable(_))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        SuiteError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        SuiteError::NotFound(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        SuiteError::InvalidState(message.into())
    }

    pub fn insufficient_data(message: impl Into<String>) -> Self {
        SuiteError::InsufficientData(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        SuiteError::StorageUnavailable(message.into())
    }
}

impl From<std::io::Error> for SuiteError {
    fn from(err: std::io::Error) -> Self {
        SuiteError::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for SuiteError {
    fn from(err: serde_json::Error) -> Self {
        SuiteError::StorageUnavailable(format!("corrupt sample data: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        let errors = [
            SuiteError::validation("x"),
            SuiteError::Conflict("x".into()),
            SuiteError::not_found("x"),
            SuiteError::invalid_state("x"),
            SuiteError::insufficient_data("x"),
            SuiteError::storage("x"),
        ];
        let mut kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_only_storage_is_retryable() {
        assert!(SuiteError::storage("down").is_retryable());
        assert!(!SuiteError::validation("bad").is_retryable());
        assert!(!SuiteError::Conflict("busy".into()).is_retryable());
        assert!(!SuiteError::insufficient_data("empty").is_retryable());
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err: SuiteError = io.into();
        assert_eq!(err.kind(), "storage_unavailable_error");
    }
}
