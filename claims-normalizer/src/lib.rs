//! Claim-batch normalizer for AuditCare Engine
//!
//! Parses one claim transaction (a root object holding an array of persons,
//! each with typed service arrays) into flat, independently addressable
//! service records:
//!
//! - Closed data model: [`ClaimBatch`], [`PersonRecord`], [`ServiceRecord`]
//!   with one tagged variant per service kind
//! - Record-level tolerance: malformed persons and services are skipped with a
//!   reason, never fatal to the batch
//! - Chunked, independently committed writes through a [`ClaimStore`],
//!   upserted by natural key so re-ingestion is idempotent
//! - Content digest and versioning, with stale-service purge after a
//!   corrected document is re-ingested

mod document;
pub mod error;
pub mod models;
pub mod normalizer;
pub mod store;

pub use error::*;
pub use models::*;
pub use normalizer::*;
pub use store::*;
