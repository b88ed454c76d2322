use std::sync::Arc;

use catalog_eligibility::{DelimitedReader, InMemoryCatalog, InMemoryEligibilityRegistry, LookupService, RegimeKind};
use claims_normalizer::{BatchStatus, ClaimStore, InMemoryClaimStore, Normalizer, ValidationStatus};
use config_engine::{BulkLoadSettings, NormalizerSettings, RuleSettings};
use error_common::codes;
use logger_redacted::PiiRedactor;
use pre_audit_engine::{
    ClaimDocument, DeductionCategory, FindingStore, InMemoryFindingStore, PreAuditPipeline,
    PreAuditService, RuleEngine,
};
use serde_json::{json, Value};

const PROCEDURES: &str = "\
code,description,sex,setting,surgical,enabled
890201,CONSULTA DE PRIMERA VEZ POR MEDICINA GENERAL,Z,Z,N,S
637301,VASECTOMIA,M,A,S,S
";

const REGISTRY: &str = "\
EPS001,CC,1032456789,PEREZ,GOMEZ,ANA,MARIA,1985-06-01,F,11,001,AC,2020-01-01,,1,900555111
EPS001,CC,80111222,RUIZ,,JUAN,,1970-01-01,M,11,001,RE,2015-01-01,2021-12-31,1,
";

struct Harness {
    claims: Arc<InMemoryClaimStore>,
    findings: Arc<InMemoryFindingStore>,
    normalizer: Normalizer,
    service: PreAuditService,
}

fn harness() -> Harness {
    let reader = DelimitedReader::from_settings(&BulkLoadSettings::default());
    let catalog = InMemoryCatalog::new();
    let (procedures, report) = reader.load_procedures(PROCEDURES.as_bytes());
    assert_eq!(report.loaded, 2);
    catalog.upsert_procedures(procedures);

    let registry = InMemoryEligibilityRegistry::new();
    let (records, _) = reader.load_registry(REGISTRY.as_bytes(), RegimeKind::Contributory);
    registry.upsert_many(records);

    let claims = Arc::new(InMemoryClaimStore::new());
    let findings = Arc::new(InMemoryFindingStore::new());
    let lookup = LookupService::new(Arc::new(catalog), Arc::new(registry));
    let engine = RuleEngine::new(lookup, &RuleSettings::default());

    Harness {
        normalizer: Normalizer::new(
            claims.clone(),
            &NormalizerSettings::default(),
            PiiRedactor::disabled(),
        ),
        service: PreAuditService::new(claims.clone(), findings.clone(), engine),
        claims,
        findings,
    }
}

fn inv_001() -> Value {
    json!({
        "obligatedPartyId": "900123456",
        "invoiceNumber": "INV-001",
        "persons": [{
            "documentType": "CC",
            "documentNumber": "1032456789",
            "sex": "F",
            "services": {
                "consultations": [
                    {
                        "providerId": "110010001",
                        "serviceDate": "2024-03-01",
                        "consultationCode": "890201",
                        "principalDiagnosis": "J069",
                        "billedAmount": 45000
                    },
                    {
                        "providerId": "110010001",
                        "serviceDate": "2024-03-02",
                        "consultationCode": "999999",
                        "principalDiagnosis": "J069",
                        "billedAmount": 38000
                    }
                ]
            }
        }]
    })
}

#[tokio::test]
async fn test_inv_001_scenario_yields_one_catalog_deduction() {
    let h = harness();

    let normalized = h.normalizer.normalize(&inv_001()).await.unwrap();
    assert_eq!(normalized.batch.statistics.total_services, 2);

    let summary = h.service.evaluate_batch("INV-001").await.unwrap();
    assert!(summary.returns.is_empty());
    assert_eq!(summary.deductions.len(), 1);

    let deduction = &summary.deductions[0];
    assert_eq!(deduction.category, DeductionCategory::CatalogValidation);
    assert_eq!(deduction.suggested_amount, deduction.billed_amount);
    assert_eq!(deduction.billed_amount.to_string(), "38000");

    let batch = h.claims.get_batch("INV-001").await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Validated);
    let statuses: Vec<ValidationStatus> = h
        .claims
        .services_for_batch("INV-001")
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.validation_status)
        .collect();
    assert_eq!(statuses, vec![ValidationStatus::Validated, ValidationStatus::Flagged]);
}

#[tokio::test]
async fn test_reevaluation_replaces_findings() {
    let h = harness();
    h.normalizer.normalize(&inv_001()).await.unwrap();

    let first = h.service.evaluate_batch("INV-001").await.unwrap();
    let second = h.service.evaluate_batch("INV-001").await.unwrap();

    assert_eq!(first.deductions[0].id, second.deductions[0].id);
    assert_eq!(second.store.carried_over, 1);
    assert_eq!(h.findings.deductions_for_batch("INV-001").await.unwrap().len(), 1);
    assert_eq!(h.findings.unassigned_deductions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_retired_affiliate_is_returned() {
    let h = harness();
    let mut doc = inv_001();
    doc["persons"][0]["documentNumber"] = json!("80111222");
    h.normalizer.normalize(&doc).await.unwrap();

    let summary = h.service.evaluate_batch("INV-001").await.unwrap();
    assert!(summary.deductions.is_empty());
    assert_eq!(summary.returns.len(), 1);
    assert_eq!(summary.returns[0].causal_code, codes::eligibility::INACTIVE_AFFILIATION);
    assert_eq!(summary.returned, 2);
}

#[tokio::test]
async fn test_batch_under_evaluation_cannot_be_reevaluated_concurrently() {
    let h = harness();
    let mut batch = h.normalizer.normalize(&inv_001()).await.unwrap().batch;
    batch.status = BatchStatus::Validating;
    h.claims.upsert_batch(&batch).await.unwrap();

    assert!(h.service.evaluate_batch("INV-001").await.is_err());
}

#[tokio::test]
async fn test_purge_removes_batch_services_and_findings() {
    let h = harness();
    h.normalizer.normalize(&inv_001()).await.unwrap();
    h.service.evaluate_batch("INV-001").await.unwrap();

    assert!(h.service.purge_batch("INV-001").await.unwrap());
    assert!(h.claims.get_batch("INV-001").await.unwrap().is_none());
    assert_eq!(h.claims.service_count("INV-001"), 0);
    assert!(h.findings.deductions_for_batch("INV-001").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_pipeline_processes_batches_independently() {
    let h = harness();
    let pipeline = PreAuditPipeline::new(h.normalizer.clone(), h.service.clone(), 2);

    let mut second = inv_001();
    second["invoiceNumber"] = json!("INV-002");
    let documents = vec![
        ClaimDocument {
            name: "inv-001.json".to_string(),
            bytes: serde_json::to_vec(&inv_001()).unwrap(),
        },
        ClaimDocument {
            name: "broken.json".to_string(),
            bytes: b"{ not json".to_vec(),
        },
        ClaimDocument {
            name: "inv-002.json".to_string(),
            bytes: serde_json::to_vec(&second).unwrap(),
        },
    ];

    let results = pipeline.process_all(documents).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().evaluation.deductions.len(), 1);
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap().name, "inv-002.json");
    assert_eq!(h.findings.unassigned_deductions().await.unwrap().len(), 2);
}
