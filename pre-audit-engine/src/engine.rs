use catalog_eligibility::{
    CareSetting, EligibilityResult, LookupService, MedicationCheck, ProcedureCheck,
};
use chrono::Utc;
use claims_normalizer::{
    ClaimBatch, PersonRef, ServiceDetail, ServiceRecord, ServiceRecordId, ValidationStatus,
};
use config_engine::RuleSettings;
use error_common::codes;
use logger_redacted::redact_document;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use tracing::debug;

use crate::error::RuleResult;
use crate::models::{
    deduction_id, return_id, AssignmentState, CandidateDeduction, CandidateReturn,
    DeductionCategory, ReviewPriority,
};

/// Findings and service statuses produced for one batch
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub returns: Vec<CandidateReturn>,
    pub deductions: Vec<CandidateDeduction>,
    pub statuses: Vec<(ServiceRecordId, ValidationStatus)>,
}

/// A rule hit before it is turned into a deduction
struct RuleHit {
    category: DeductionCategory,
    causal_code: &'static str,
    reason: String,
}

/// Suggested amounts expressed as shares of the billed amount
#[derive(Debug, Clone, Copy)]
struct DeductionRatios {
    restriction: Decimal,
    missing_diagnosis: Decimal,
}

/// Stateless rules over one batch's services.
///
/// Per person: eligibility is checked once on the earliest service date and an
/// ineligible person yields a single return covering all its services. Only
/// services of eligible persons are checked against the catalogs.
#[derive(Clone)]
pub struct RuleEngine {
    lookup: LookupService,
    ratios: DeductionRatios,
    high_value_threshold: Decimal,
}

impl RuleEngine {
    pub fn new(lookup: LookupService, settings: &RuleSettings) -> Self {
        let ratio = |value: f64| {
            Decimal::try_from(value)
                .unwrap_or(Decimal::ZERO)
                .clamp(Decimal::ZERO, Decimal::ONE)
        };
        Self {
            lookup,
            ratios: DeductionRatios {
                restriction: ratio(settings.restriction_deduction_ratio),
                missing_diagnosis: ratio(settings.missing_diagnosis_ratio),
            },
            high_value_threshold: Decimal::from(settings.high_value_threshold),
        }
    }

    /// # Errors
    ///
    /// Only lookup store failures; catalog and eligibility mismatches are
    /// findings, not errors.
    pub async fn evaluate(
        &self,
        batch: &ClaimBatch,
        services: &[ServiceRecord],
    ) -> RuleResult<Evaluation> {
        let mut evaluation = Evaluation::default();

        for (person, person_services) in group_by_person(services) {
            let Some(eligibility_date) = person_services.iter().map(|s| s.service_date).min()
            else {
                continue;
            };
            let eligibility = self
                .lookup
                .check_eligibility(&person.doc_type, &person.doc_number, eligibility_date)
                .await?;

            if let EligibilityResult::Ineligible {
                causal_code,
                reason,
            } = eligibility
            {
                debug!(
                    invoice = %batch.invoice_number,
                    person = %redact_document(&person.doc_type, &person.doc_number),
                    causal_code = %causal_code,
                    "Person not eligible, returning its services"
                );
                let service_ids: Vec<ServiceRecordId> =
                    person_services.iter().map(|s| s.id.clone()).collect();
                evaluation.statuses.extend(
                    service_ids
                        .iter()
                        .map(|id| (id.clone(), ValidationStatus::Returned)),
                );
                evaluation.returns.push(CandidateReturn {
                    id: return_id(&batch.invoice_number, batch.version, person),
                    invoice_number: batch.invoice_number.clone(),
                    batch_version: batch.version,
                    person: person.clone(),
                    causal_code,
                    reason,
                    service_ids,
                    created_at: Utc::now(),
                });
                continue;
            }

            for service in person_services {
                let hits = self.check_service(service).await?;
                let status = if hits.is_empty() {
                    ValidationStatus::Validated
                } else {
                    ValidationStatus::Flagged
                };
                evaluation.statuses.push((service.id.clone(), status));
                evaluation.deductions.extend(
                    hits.into_iter()
                        .map(|hit| self.deduction(batch, service, hit)),
                );
            }
        }

        Ok(evaluation)
    }

    async fn check_service(&self, service: &ServiceRecord) -> RuleResult<Vec<RuleHit>> {
        let mut hits = Vec::new();

        match &service.detail {
            ServiceDetail::Consultation {
                consultation_code, ..
            } => {
                let check = self
                    .lookup
                    .validate_procedure(
                        consultation_code,
                        service.recorded_sex,
                        Some(CareSetting::Ambulatory),
                    )
                    .await?;
                hits.extend(procedure_hit(consultation_code, check));
            }
            ServiceDetail::Procedure {
                procedure_code,
                care_setting,
                ..
            } => {
                let check = self
                    .lookup
                    .validate_procedure(procedure_code, service.recorded_sex, *care_setting)
                    .await?;
                hits.extend(procedure_hit(procedure_code, check));
            }
            ServiceDetail::Medication { drug_code, .. } => {
                let check = self.lookup.validate_medication(drug_code).await?;
                hits.extend(medication_hit(drug_code, check));
            }
            ServiceDetail::EmergencyVisit { .. }
            | ServiceDetail::Hospitalization { .. }
            | ServiceDetail::AncillaryService { .. }
            | ServiceDetail::NewbornCare { .. } => {}
        }

        if service.kind().requires_diagnosis() && service.principal_diagnosis.is_none() {
            hits.push(RuleHit {
                category: DeductionCategory::MissingDiagnosis,
                causal_code: codes::deduction::MISSING_DIAGNOSIS,
                reason: format!("{} has no principal diagnosis", service.kind()),
            });
        }

        Ok(hits)
    }

    fn deduction(
        &self,
        batch: &ClaimBatch,
        service: &ServiceRecord,
        hit: RuleHit,
    ) -> CandidateDeduction {
        let billed = service.billed_amount;
        let suggested = match hit.category {
            DeductionCategory::CatalogValidation => billed,
            DeductionCategory::RestrictionMismatch => share(billed, self.ratios.restriction),
            DeductionCategory::MissingDiagnosis => share(billed, self.ratios.missing_diagnosis),
        };
        let priority = if billed >= self.high_value_threshold {
            ReviewPriority::Critical
        } else {
            hit.category.base_priority()
        };

        CandidateDeduction {
            id: deduction_id(&batch.invoice_number, batch.version, &service.id, hit.category),
            invoice_number: batch.invoice_number.clone(),
            batch_version: batch.version,
            service_id: service.id.clone(),
            service_kind: service.kind(),
            category: hit.category,
            causal_code: hit.causal_code.to_string(),
            reason: hit.reason,
            billed_amount: billed,
            suggested_amount: suggested,
            priority,
            assignment: AssignmentState::Unassigned,
            created_at: Utc::now(),
        }
    }
}

/// Billed × ratio to cents, never above billed
fn share(billed: Decimal, ratio: Decimal) -> Decimal {
    (billed * ratio)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .min(billed)
}

fn procedure_hit(code: &str, check: ProcedureCheck) -> Option<RuleHit> {
    match check {
        ProcedureCheck::Valid(_) => None,
        ProcedureCheck::NotFound => Some(RuleHit {
            category: DeductionCategory::CatalogValidation,
            causal_code: codes::deduction::UNKNOWN_CODE,
            reason: format!("code {code} is not in the procedure catalog"),
        }),
        ProcedureCheck::Disabled(_) => Some(RuleHit {
            category: DeductionCategory::CatalogValidation,
            causal_code: codes::deduction::DISABLED_CODE,
            reason: format!("code {code} is disabled in the procedure catalog"),
        }),
        ProcedureCheck::RestrictionMismatch(violation) => Some(RuleHit {
            category: DeductionCategory::RestrictionMismatch,
            causal_code: violation.causal_code(),
            reason: violation.to_string(),
        }),
    }
}

fn medication_hit(code: &str, check: MedicationCheck) -> Option<RuleHit> {
    match check {
        MedicationCheck::Valid(_) => None,
        MedicationCheck::NotFound => Some(RuleHit {
            category: DeductionCategory::CatalogValidation,
            causal_code: codes::deduction::UNKNOWN_CODE,
            reason: format!("code {code} is not in the medication catalog"),
        }),
        MedicationCheck::Disabled(_) => Some(RuleHit {
            category: DeductionCategory::CatalogValidation,
            causal_code: codes::deduction::DISABLED_CODE,
            reason: format!("code {code} is disabled in the medication catalog"),
        }),
    }
}

/// Services grouped per person in order of first appearance
fn group_by_person(services: &[ServiceRecord]) -> Vec<(&PersonRef, Vec<&ServiceRecord>)> {
    let mut groups: Vec<(&PersonRef, Vec<&ServiceRecord>)> = Vec::new();
    let mut index: HashMap<&PersonRef, usize> = HashMap::new();
    for service in services {
        match index.get(&service.person).and_then(|i| groups.get_mut(*i)) {
            Some((_, group)) => group.push(service),
            None => {
                index.insert(&service.person, groups.len());
                groups.push((&service.person, vec![service]));
            }
        }
    }
    groups
}
