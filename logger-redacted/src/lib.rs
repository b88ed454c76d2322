//! Logging for AuditCare Engine with person-identifier redaction
//!
//! Claim batches carry identity documents, names and contact data of covered
//! persons. None of it may reach the logs in clear:
//!
//! - Structured fields use [`redact_document`], a stable correlation token
//!   (`DOC[xxxxxxxx]`) so lines about the same person can still be joined
//! - Free text such as parser messages and skip reasons goes through
//!   [`PiiRedactor`], which masks typed documents (`CC 1032456789`), mobile
//!   numbers and e-mail addresses
//!
//! # Example
//!
//! ```rust
//! use logger_redacted::{redact_document, PiiRedactor};
//!
//! let token = redact_document("CC", "1032456789");
//! tracing::info!(person = %token, "eligibility checked");
//!
//! let redactor = PiiRedactor::default();
//! let reason = redactor.redact("duplicate person CC 1032456789");
//! assert!(!reason.contains("1032456789"));
//! ```

pub mod config;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter '{0}'")]
    InvalidFilter(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.log_level` when set. Events go to stderr so
/// command output on stdout stays machine-readable.
///
/// # Errors
///
/// Fails when the level filter does not parse or a subscriber is already set.
pub fn init_tracing(config: &LoggerConfig) -> Result<(), LoggerError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|_| LoggerError::InvalidFilter(config.log_level.clone()))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_timer(fmt::time::ChronoUtc::rfc_3339())
                    .with_level(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_timer(fmt::time::ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
    };

    result.map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))
}

/// Redactor honouring the `redaction_enabled` switch
pub fn redactor_for(config: &LoggerConfig) -> PiiRedactor {
    if config.redaction_enabled {
        PiiRedactor::default()
    } else {
        PiiRedactor::disabled()
    }
}
