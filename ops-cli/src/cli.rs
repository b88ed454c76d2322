use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "auditcare")]
#[command(version, about = "Normalize, pre-audit and assign health-claim batches")]
pub struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(long, global = true, env = "AUDITCARE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Structured JSON logs on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Normalize claim documents and print batch statistics
    Normalize(NormalizeArgs),
    /// Normalize and evaluate claim documents against reference data
    Evaluate(EvaluateArgs),
    /// Evaluate, generate an assignment proposal and optionally decide it
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Claim documents (JSON)
    #[arg(required = true)]
    pub claims: Vec<PathBuf>,

    /// Print results as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Reference bulk files; delimiter and encoding come from configuration
#[derive(Args, Debug, Default)]
pub struct ReferenceArgs {
    /// Procedure catalog
    #[arg(long)]
    pub procedures: Option<PathBuf>,

    /// Medication catalog
    #[arg(long)]
    pub medications: Option<PathBuf>,

    /// Contributory-regime eligibility registry
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Subsidized-regime eligibility registry
    #[arg(long)]
    pub registry_subsidized: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Claim documents (JSON)
    #[arg(required = true)]
    pub claims: Vec<PathBuf>,

    #[command(flatten)]
    pub reference: ReferenceArgs,

    /// Batches processed concurrently
    #[arg(long, default_value = "4")]
    pub workers: usize,

    /// Print results as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub evaluate: EvaluateArgs,

    /// Auditor roster (JSON)
    #[arg(long)]
    pub roster: PathBuf,

    /// Supervisor decision applied to the generated proposal
    #[arg(long, value_enum)]
    pub decision: Option<DecisionArg>,

    /// Actor recorded in the decision log
    #[arg(long, default_value = "operator")]
    pub supervisor: String,

    /// Reason recorded with a rejection
    #[arg(long)]
    pub reason: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecisionArg {
    Approve,
    Reject,
}
