//! Configuration management for AuditCare Engine
//!
//! Every tunable of the pipeline is injected from here, never hard-coded:
//! chunk size of the normalizer, delimiter and encoding of reference bulk
//! loads, deduction ratios of the rule engine, scheduler weights and default
//! capacity, approval deadline and logging.
//!
//! Sources are merged in order, later ones winning:
//!
//! 1. Built-in defaults
//! 2. An optional YAML/TOML/JSON file
//! 3. Environment variables prefixed `AUDITCARE__`
//!
//! # Example
//!
//! ```rust,no_run
//! use config_engine::ConfigEngine;
//!
//! let config = ConfigEngine::new().with_file("auditcare.yaml").load()?;
//! println!("chunk size: {}", config.normalizer.chunk_size);
//! # Ok::<(), config_engine::ConfigError>(())
//! ```

pub mod engine;
pub mod error;
pub mod settings;

pub use engine::*;
pub use error::*;
pub use settings::*;
