//! Catalog and eligibility lookups for AuditCare Engine
//!
//! Read-only point lookups against the three reference sets the pre-audit
//! pipeline validates claims with:
//!
//! - Procedure catalog (consultation and procedure codes) with sex and
//!   care-setting restrictions
//! - Medication catalog
//! - Affiliate eligibility registry with effective and termination dates,
//!   unified over the contributory and subsidized regimes
//!
//! Stores are behind async traits ([`CatalogRepository`],
//! [`EligibilityRegistry`]); the in-memory implementations are filled by the
//! delimited bulk loaders in [`loader`].

pub mod catalog;
pub mod dates;
pub mod eligibility;
pub mod error;
pub mod loader;
pub mod models;
pub mod service;

pub use catalog::*;
pub use dates::*;
pub use eligibility::*;
pub use error::*;
pub use loader::*;
pub use models::*;
pub use service::*;
