//! Approval workflow for AuditCare assignment proposals
//!
//! Proposals from the workload balancer are not binding until a supervisor
//! rules on them. This crate owns the proposal state machine:
//!
//! - `PENDING_APPROVAL → APPROVED → EXECUTED`: the proposed pairings are
//!   committed
//! - `PENDING_APPROVAL → MODIFIED → EXECUTED`: a replacement pairing set,
//!   validated against current capacity, is committed instead
//! - `PENDING_APPROVAL → REJECTED`: nothing is committed and the findings
//!   return to the pool
//! - `PENDING_APPROVAL → EXPIRED`: the deadline passed; applied lazily on the
//!   next read or decision
//!
//! Terminal proposals are immutable. A commit increments every auditor's
//! load under optimistic version checks and marks every finding assigned,
//! or changes nothing.
//!
//! # Example
//!
//! ```ignore
//! use workflow_engine::{ApprovalWorkflow, Decision, SystemClock};
//!
//! let workflow = ApprovalWorkflow::new(proposals, roster, findings, Arc::new(SystemClock));
//! let executed = workflow.decide(proposal_id, Decision::Approve, "supervisor-7").await?;
//! ```

pub mod approval;
pub mod decision;
pub mod error;

pub use approval::*;
pub use decision::*;
pub use error::*;
