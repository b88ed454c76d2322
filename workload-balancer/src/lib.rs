//! Workload balancer for AuditCare Engine
//!
//! Distributes pending candidate deductions across the auditor pool:
//!
//! - Weighted fit score per (finding, auditor) pair: free capacity,
//!   specialization match, historical performance and finding priority
//! - Greedy assignment in priority order that never pushes an auditor past
//!   its daily capacity; leftovers are reported, not dropped
//! - Balance score `1 - stddev/mean` over per-auditor counts
//! - Proposals are stored `PENDING_APPROVAL` with a deadline and only become
//!   binding through the approval workflow
//!
//! Generation is deterministic for identical findings, roster and weights.

pub mod error;
pub mod models;
pub mod roster;
pub mod scheduler;
pub mod scoring;
pub mod store;

pub use error::*;
pub use models::*;
pub use roster::*;
pub use scheduler::*;
pub use scoring::*;
pub use store::*;
