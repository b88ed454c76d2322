//! Operator CLI for AuditCare Engine
//!
//! Runs the pipeline over files with in-memory stores:
//!
//! ```bash
//! # Normalize only
//! auditcare normalize inv-001.json
//!
//! # Normalize and pre-audit against reference files
//! auditcare evaluate inv-001.json inv-002.json \
//!     --procedures cups.csv --medications cum.csv \
//!     --registry contributory.csv --registry-subsidized subsidized.csv
//!
//! # Full run: findings, assignment proposal and a supervisor decision
//! auditcare --config auditcare.yaml run inv-001.json --registry contributory.csv \
//!     --procedures cups.csv --roster roster.json --decision approve --supervisor sup-7
//! ```
//!
//! Results go to stdout (`--json` for machine-readable output), logs go to
//! stderr.

pub mod cli;
pub mod commands;
pub mod context;
pub mod report;

pub use cli::*;
pub use commands::execute;
pub use context::{load_config, Engine, ReferenceData};
