use error_common::{codes, Classified, ErrorCategory};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration source failed: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl Classified for ConfigError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Source(_) => codes::configuration::SOURCE_FAILED,
            Self::ValidationError(_) => codes::configuration::INVALID_VALUE,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
