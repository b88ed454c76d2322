//! Pre-audit rule engine for AuditCare Engine
//!
//! Consumes normalized service records plus catalog and eligibility lookups
//! and produces two disjoint finding classes:
//!
//! - **Candidate returns**: person-scoped; the person was not eligible on the
//!   earliest service date, so none of its services proceed to audit
//! - **Candidate deductions**: service-scoped monetary findings with a
//!   category, a causal code, a suggested amount and a review priority
//!
//! # Deduction categories
//!
//! - `catalog-validation`: unknown or disabled code, suggests the full billed amount
//! - `restriction-mismatch`: sex or care-setting restriction not satisfied
//! - `missing-diagnosis`: consultation or hospitalization without a principal diagnosis
//!
//! Finding ids are deterministic, so re-evaluating a batch replaces its
//! findings instead of duplicating them and keeps the assignment of findings
//! that survive.
//!
//! # Example
//!
//! ```rust,ignore
//! let service = PreAuditService::new(claims, findings, RuleEngine::new(lookup, &config.rules));
//! let summary = service.evaluate_batch("INV-001").await?;
//! println!("{} deductions", summary.deductions.len());
//! ```

pub mod engine;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod service;
pub mod store;

pub use engine::*;
pub use error::*;
pub use models::*;
pub use pipeline::*;
pub use service::*;
pub use store::*;
