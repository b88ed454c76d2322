use error_common::{codes, Classified, ErrorCategory, ErrorContext, StoreError};
use thiserror::Error;

use crate::models::BatchStatus;

#[derive(Error, Debug)]
pub enum NormalizeError {
    /// Malformed root document; nothing of the batch is written
    #[error("Malformed claim document {context}: {message}")]
    Structural {
        code: &'static str,
        message: String,
        context: ErrorContext,
    },

    #[error("Batch {invoice} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        invoice: String,
        from: BatchStatus,
        to: BatchStatus,
    },

    #[error("Batch {0} not found")]
    BatchNotFound(String),

    #[error("Claim store error {context}: {source}")]
    Store {
        #[source]
        source: StoreError,
        context: ErrorContext,
    },
}

impl NormalizeError {
    pub(crate) fn structural(code: &'static str, message: impl Into<String>) -> Self {
        Self::Structural {
            code,
            message: message.into(),
            context: ErrorContext::new().with_causal_code(code),
        }
    }

    pub(crate) fn store(source: StoreError, context: ErrorContext) -> Self {
        Self::Store { source, context }
    }
}

impl Classified for NormalizeError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Structural { .. } | Self::InvalidTransition { .. } => ErrorCategory::Structural,
            Self::BatchNotFound(_) | Self::Store { .. } => ErrorCategory::Storage,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Structural { code, .. } => code,
            Self::InvalidTransition { .. } => codes::structural::INVALID_STATUS_TRANSITION,
            Self::BatchNotFound(_) => codes::storage::NOT_FOUND,
            Self::Store { source, .. } => source.code(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Store { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

pub type NormalizeResult<T> = Result<T, NormalizeError>;
