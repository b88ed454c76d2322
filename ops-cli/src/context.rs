use anyhow::{Context, Result};
use catalog_eligibility::{
    DelimitedReader, InMemoryCatalog, InMemoryEligibilityRegistry, LoadReport, LookupService,
    RegimeKind,
};
use claims_normalizer::{InMemoryClaimStore, Normalizer};
use config_engine::{AuditCareConfig, ConfigEngine};
use logger_redacted::redactor_for;
use pre_audit_engine::{
    ClaimDocument, InMemoryFindingStore, PreAuditPipeline, PreAuditService, RuleEngine,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use workflow_engine::{ApprovalWorkflow, SystemClock};
use workload_balancer::{
    parse_roster, AssignmentScheduler, InMemoryProposalStore, InMemoryRoster,
};

use crate::cli::ReferenceArgs;

/// Defaults, then the optional file, then `AUDITCARE__*` variables
pub fn load_config(path: Option<&Path>) -> Result<AuditCareConfig> {
    let mut engine = ConfigEngine::new().with_environment(true);
    if let Some(path) = path {
        engine = engine.with_file(path);
    }
    engine.load().context("loading configuration")
}

/// Read every claim document up front so a missing file fails fast
pub fn read_documents(paths: &[PathBuf]) -> Result<Vec<ClaimDocument>> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading claim document {}", path.display()))?;
            let name = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
            Ok(ClaimDocument { name, bytes })
        })
        .collect()
}

/// Reference catalogs and registries loaded from bulk files
pub struct ReferenceData {
    pub catalog: InMemoryCatalog,
    pub registry: InMemoryEligibilityRegistry,
}

impl ReferenceData {
    pub fn empty() -> Self {
        Self {
            catalog: InMemoryCatalog::new(),
            registry: InMemoryEligibilityRegistry::new(),
        }
    }

    pub fn load(args: &ReferenceArgs, config: &AuditCareConfig) -> Result<Self> {
        let reader = DelimitedReader::from_settings(&config.bulk_load);
        let Self { catalog, registry } = Self::empty();

        if let Some(path) = &args.procedures {
            let (entries, report) = reader.load_procedures(&read_reference(path)?);
            log_load("procedures", path, &report);
            catalog.upsert_procedures(entries);
        }
        if let Some(path) = &args.medications {
            let (entries, report) = reader.load_medications(&read_reference(path)?);
            log_load("medications", path, &report);
            catalog.upsert_medications(entries);
        }
        for (path, regime) in [
            (&args.registry, RegimeKind::Contributory),
            (&args.registry_subsidized, RegimeKind::Subsidized),
        ] {
            if let Some(path) = path {
                let (records, report) = reader.load_registry(&read_reference(path)?, regime);
                log_load("registry", path, &report);
                registry.upsert_many(records);
            }
        }
        Ok(Self { catalog, registry })
    }
}

fn read_reference(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading reference file {}", path.display()))
}

fn log_load(kind: &str, path: &Path, report: &LoadReport) {
    info!(
        kind,
        file = %path.display(),
        loaded = report.loaded,
        skipped = report.skipped.len(),
        "Reference file loaded"
    );
    for skipped in report.skipped.iter().take(10) {
        warn!(kind, line = skipped.line, reason = %skipped.reason, "Reference line skipped");
    }
}

/// Every component wired over in-memory stores
pub struct Engine {
    pub config: AuditCareConfig,
    pub normalizer: Normalizer,
    pub pipeline: PreAuditPipeline,
    pub findings: Arc<InMemoryFindingStore>,
    pub proposals: Arc<InMemoryProposalStore>,
}

impl Engine {
    pub fn new(config: AuditCareConfig, reference: ReferenceData, workers: usize) -> Self {
        let claims = Arc::new(InMemoryClaimStore::new());
        let findings = Arc::new(InMemoryFindingStore::new());
        let normalizer = Normalizer::new(
            claims.clone(),
            &config.normalizer,
            redactor_for(&config.logging),
        );
        let lookup = LookupService::new(Arc::new(reference.catalog), Arc::new(reference.registry));
        let service = PreAuditService::new(
            claims,
            findings.clone(),
            RuleEngine::new(lookup, &config.rules),
        );
        Self {
            pipeline: PreAuditPipeline::new(normalizer.clone(), service, workers),
            normalizer,
            findings,
            proposals: Arc::new(InMemoryProposalStore::new()),
            config,
        }
    }

    /// Scheduler and workflow over one roster file
    pub fn assignment(&self, roster_path: &Path) -> Result<(AssignmentScheduler, ApprovalWorkflow)> {
        let bytes = std::fs::read(roster_path)
            .with_context(|| format!("reading roster {}", roster_path.display()))?;
        let auditors = parse_roster(&bytes, self.config.balancer.default_daily_capacity)?;
        info!(auditors = auditors.len(), "Roster loaded");
        let roster = Arc::new(InMemoryRoster::new(auditors));

        let scheduler = AssignmentScheduler::new(
            roster.clone(),
            self.proposals.clone(),
            self.findings.clone(),
            &self.config.balancer,
            self.config.approval.deadline(),
        )?;
        let workflow = ApprovalWorkflow::new(
            self.proposals.clone(),
            roster,
            self.findings.clone(),
            Arc::new(SystemClock),
        );
        Ok((scheduler, workflow))
    }
}
