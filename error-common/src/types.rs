use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codes;

/// Error taxonomy shared by every pipeline component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed root input; the whole batch is aborted
    Structural,
    /// One malformed entry; skipped and counted
    RecordLevel,
    /// Capacity exhaustion and scheduling input problems
    Scheduling,
    /// Proposal transition failures
    Workflow,
    Configuration,
    Storage,
}

/// Implemented by every public error so callers can branch on category,
/// code and retryability without matching concrete enums.
pub trait Classified: std::error::Error {
    fn category(&self) -> ErrorCategory;

    fn code(&self) -> &'static str;

    fn is_retryable(&self) -> bool {
        false
    }
}

/// Failures raised by repository implementations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl Classified for StoreError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }

    fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => codes::storage::NOT_FOUND,
            Self::Conflict(_) => codes::storage::CONFLICT,
            Self::Unavailable(_) => codes::storage::UNAVAILABLE,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Unavailable(_))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Log a classified error with its code and category as structured fields
pub fn log_error<E: Classified>(context: &str, error: &E) {
    tracing::error!(
        context = context,
        error_code = error.code(),
        category = ?error.category(),
        retryable = error.is_retryable(),
        error = %error,
        "AuditCare error occurred"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_classification() {
        let missing = StoreError::not_found("proposal", "p-1");
        assert_eq!(missing.code(), codes::storage::NOT_FOUND);
        assert!(!missing.is_retryable());
        assert_eq!(missing.to_string(), "proposal not found: p-1");

        let conflict = StoreError::Conflict("version moved".to_string());
        assert!(conflict.is_retryable());
        assert_eq!(conflict.category(), ErrorCategory::Storage);
    }
}
