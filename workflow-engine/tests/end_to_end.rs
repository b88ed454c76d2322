use std::sync::Arc;

use catalog_eligibility::{
    DelimitedReader, InMemoryCatalog, InMemoryEligibilityRegistry, LookupService, RegimeKind,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use claims_normalizer::{InMemoryClaimStore, Normalizer};
use config_engine::{BalancerSettings, BulkLoadSettings, NormalizerSettings, RuleSettings};
use logger_redacted::PiiRedactor;
use pre_audit_engine::{
    AssignmentState, DeductionCategory, FindingStore, InMemoryFindingStore, PreAuditService,
    RuleEngine,
};
use serde_json::json;
use workflow_engine::{ApprovalWorkflow, Decision, ManualClock};
use workload_balancer::{
    AssignmentScheduler, AuditorProfile, AuditorRole, InMemoryProposalStore, InMemoryRoster,
    ProposalStatus,
};

const PROCEDURES: &str = "\
890201,CONSULTA DE PRIMERA VEZ POR MEDICINA GENERAL,Z,Z,N,S
";

const REGISTRY: &str = "\
EPS001,CC,1032456789,PEREZ,GOMEZ,ANA,MARIA,1985-06-01,F,11,001,AC,2020-01-01,,1,900555111
";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
}

struct System {
    normalizer: Normalizer,
    service: PreAuditService,
    findings: Arc<InMemoryFindingStore>,
    roster: Arc<InMemoryRoster>,
    scheduler: AssignmentScheduler,
    workflow: ApprovalWorkflow,
    clock: ManualClock,
}

fn system(auditors: Vec<AuditorProfile>) -> System {
    let reader = DelimitedReader::from_settings(&BulkLoadSettings::default());
    let catalog = InMemoryCatalog::new();
    catalog.upsert_procedures(reader.load_procedures(PROCEDURES.as_bytes()).0);
    let registry = InMemoryEligibilityRegistry::new();
    registry.upsert_many(
        reader
            .load_registry(REGISTRY.as_bytes(), RegimeKind::Contributory)
            .0,
    );

    let claims = Arc::new(InMemoryClaimStore::new());
    let findings = Arc::new(InMemoryFindingStore::new());
    let proposals = Arc::new(InMemoryProposalStore::new());
    let roster = Arc::new(InMemoryRoster::new(auditors));
    let clock = ManualClock::new(t0());

    let engine = RuleEngine::new(
        LookupService::new(Arc::new(catalog), Arc::new(registry)),
        &RuleSettings::default(),
    );
    System {
        normalizer: Normalizer::new(
            claims.clone(),
            &NormalizerSettings::default(),
            PiiRedactor::disabled(),
        ),
        service: PreAuditService::new(claims, findings.clone(), engine),
        scheduler: AssignmentScheduler::new(
            roster.clone(),
            proposals.clone(),
            findings.clone(),
            &BalancerSettings::default(),
            Duration::hours(24),
        )
        .unwrap(),
        workflow: ApprovalWorkflow::new(
            proposals,
            roster.clone(),
            findings.clone(),
            Arc::new(clock.clone()),
        ),
        findings,
        roster,
        clock,
    }
}

fn auditor(id: &str, capacity: u32) -> AuditorProfile {
    AuditorProfile {
        id: id.to_string(),
        name: Some("Auditor".to_string()),
        role: AuditorRole::Medical,
        specializations: vec!["consultation".to_string()],
        daily_capacity: capacity,
        current_load: 0,
        version: 0,
        mean_handling_minutes: Some(12.0),
        deduction_rate: Some(0.4),
        active: true,
    }
}

fn inv_001() -> serde_json::Value {
    json!({
        "numDocumentoIdObligado": "900123456",
        "numFactura": "INV-001",
        "usuarios": [{
            "tipoDocumentoIdentificacion": "CC",
            "numDocumentoIdentificacion": "1032456789",
            "codSexo": "F",
            "servicios": {
                "consultas": [
                    {
                        "codPrestador": "110010001",
                        "fechaInicioAtencion": "2024-03-01",
                        "codConsulta": "890201",
                        "codDiagnosticoPrincipal": "J069",
                        "vrServicio": 45000
                    },
                    {
                        "codPrestador": "110010001",
                        "fechaInicioAtencion": "2024-03-02",
                        "codConsulta": "999999",
                        "codDiagnosticoPrincipal": "J069",
                        "vrServicio": 38000
                    }
                ]
            }
        }]
    })
}

#[tokio::test]
async fn test_inv_001_from_document_to_executed_assignment() {
    let s = system(vec![auditor("aud-1", 5)]);

    let normalized = s.normalizer.normalize(&inv_001()).await.unwrap();
    assert_eq!(normalized.batch.statistics.total_services, 2);

    let evaluation = s.service.evaluate_batch("INV-001").await.unwrap();
    assert!(evaluation.returns.is_empty());
    assert_eq!(evaluation.deductions.len(), 1);
    assert_eq!(
        evaluation.deductions[0].category,
        DeductionCategory::CatalogValidation
    );

    let proposal = s.scheduler.generate(t0()).await.unwrap();
    assert_eq!(proposal.assignments.len(), 1);
    assert_eq!(proposal.assignments[0].auditor_id, "aud-1");
    assert!((proposal.balance_score - 1.0).abs() < f64::EPSILON);

    s.clock.advance(Duration::hours(2));
    let executed = s
        .workflow
        .decide(proposal.id, Decision::Approve, "supervisor-7")
        .await
        .unwrap();

    assert_eq!(executed.status, ProposalStatus::Executed);
    assert_eq!(s.roster.get("aud-1").await.unwrap().current_load, 1);
    let stored = s.findings.deductions_for_batch("INV-001").await.unwrap();
    assert!(matches!(
        &stored[0].assignment,
        AssignmentState::Assigned { auditor_id, proposal_id, .. }
            if auditor_id == "aud-1" && *proposal_id == proposal.id
    ));
}

#[tokio::test]
async fn test_rejected_findings_are_proposed_again() {
    let s = system(vec![auditor("aud-1", 5)]);
    s.normalizer.normalize(&inv_001()).await.unwrap();
    s.service.evaluate_batch("INV-001").await.unwrap();

    let first = s.scheduler.generate(t0()).await.unwrap();
    s.workflow
        .decide(
            first.id,
            Decision::Reject {
                reason: "wait for corrected invoice".to_string(),
            },
            "supervisor-7",
        )
        .await
        .unwrap();
    let second = s.scheduler.generate(t0() + Duration::hours(1)).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(second.assignments.len(), 1);
    assert_eq!(
        second.assignments[0].finding_id,
        first.assignments[0].finding_id
    );
}

#[tokio::test]
async fn test_re_evaluation_keeps_committed_assignment() {
    let s = system(vec![auditor("aud-1", 5)]);
    s.normalizer.normalize(&inv_001()).await.unwrap();
    s.service.evaluate_batch("INV-001").await.unwrap();
    let proposal = s.scheduler.generate(t0()).await.unwrap();
    s.workflow
        .decide(proposal.id, Decision::Approve, "supervisor-7")
        .await
        .unwrap();

    s.service.evaluate_batch("INV-001").await.unwrap();
    let next = s.scheduler.generate(t0() + Duration::hours(1)).await.unwrap();

    assert!(next.findings.is_empty());
    assert!(s.findings.unassigned_deductions().await.unwrap().is_empty());
}
