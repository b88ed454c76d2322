use error_common::{Classified, ErrorCategory, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Reference store error: {0}")]
    Store(#[from] StoreError),

    #[error("Reference file could not be read: {0}")]
    Io(#[from] std::io::Error),
}

impl Classified for LookupError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Store(inner) => inner.code(),
            Self::Io(_) => error_common::codes::storage::UNAVAILABLE,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Store(inner) => inner.is_retryable(),
            Self::Io(_) => false,
        }
    }
}

pub type LookupResult<T> = Result<T, LookupError>;
