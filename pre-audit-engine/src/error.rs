use catalog_eligibility::LookupError;
use claims_normalizer::{BatchStatus, NormalizeError};
use error_common::{codes, Classified, ErrorCategory, ErrorContext, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Reference lookup failed: {0}")]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("Batch {0} not found")]
    BatchNotFound(String),

    #[error("Batch {invoice} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        invoice: String,
        from: BatchStatus,
        to: BatchStatus,
    },

    #[error("Finding store error {context}: {source}")]
    Store {
        #[source]
        source: StoreError,
        context: ErrorContext,
    },

    #[error("Batch worker failed: {0}")]
    Worker(String),
}

impl RuleError {
    pub(crate) fn store(source: StoreError, invoice: &str) -> Self {
        Self::Store {
            source,
            context: ErrorContext::new().with_batch_id(invoice),
        }
    }
}

impl Classified for RuleError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Normalize(inner) => inner.category(),
            Self::InvalidTransition { .. } => ErrorCategory::Structural,
            Self::Lookup(_) | Self::BatchNotFound(_) | Self::Store { .. } | Self::Worker(_) => {
                ErrorCategory::Storage
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Lookup(inner) => inner.code(),
            Self::Normalize(inner) => inner.code(),
            Self::BatchNotFound(_) => codes::storage::NOT_FOUND,
            Self::InvalidTransition { .. } => codes::structural::INVALID_STATUS_TRANSITION,
            Self::Store { source, .. } => source.code(),
            Self::Worker(_) => codes::storage::UNAVAILABLE,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Lookup(inner) => inner.is_retryable(),
            Self::Normalize(inner) => inner.is_retryable(),
            Self::Store { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

pub type RuleResult<T> = Result<T, RuleError>;
