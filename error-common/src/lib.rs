//! Common error handling utilities for AuditCare Engine
//!
//! Shared by every pipeline crate:
//!
//! - **Causal codes**: the stable business codes carried by candidate returns
//!   and candidate deductions (`DE16xx`, `FA57xx`, `PE01xx`, `SO03xx`)
//! - **Error codes**: identifiers for structural, scheduling, workflow,
//!   storage and configuration failures
//! - **Error context**: batch id, record index and causal code attached to
//!   failures so they are actionable
//! - **Classification**: [`Classified`] exposes category, code and
//!   retryability for every public error type
//!
//! # Example
//!
//! ```rust
//! use error_common::{codes, Classified, ErrorContext, StoreError};
//!
//! let context = ErrorContext::new()
//!     .with_batch_id("INV-001")
//!     .with_causal_code(codes::eligibility::BEFORE_EFFECTIVE_DATE);
//! assert_eq!(context.causal_code.as_deref(), Some("DE1601"));
//!
//! let error = StoreError::Conflict("auditor version moved".to_string());
//! assert!(error.is_retryable());
//! ```

pub mod codes;
pub mod context;
pub mod types;

pub use context::*;
pub use types::*;
