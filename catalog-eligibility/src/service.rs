use chrono::NaiveDate;
use logger_redacted::redact_document;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::CatalogRepository;
use crate::eligibility::{EligibilityRegistry, EligibilityVerifier};
use crate::error::LookupResult;
use crate::models::{
    CareSetting, EligibilityResult, MedicationEntry, ProcedureEntry, RestrictionViolation, Sex,
};

/// Result of validating a procedure code against the catalog
#[derive(Debug, Clone, PartialEq)]
pub enum ProcedureCheck {
    Valid(ProcedureEntry),
    NotFound,
    Disabled(ProcedureEntry),
    RestrictionMismatch(RestrictionViolation),
}

/// Result of validating a medication code against the catalog
#[derive(Debug, Clone, PartialEq)]
pub enum MedicationCheck {
    Valid(MedicationEntry),
    NotFound,
    Disabled(MedicationEntry),
}

/// Read-only point lookups over catalogs and the eligibility registry.
///
/// Holds no mutable state, so one instance is shared by every worker.
#[derive(Clone)]
pub struct LookupService {
    catalog: Arc<dyn CatalogRepository>,
    registry: Arc<dyn EligibilityRegistry>,
}

impl LookupService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, registry: Arc<dyn EligibilityRegistry>) -> Self {
        Self { catalog, registry }
    }

    /// # Errors
    ///
    /// Only store failures; an unknown code is `Ok(None)`.
    pub async fn lookup_procedure(&self, code: &str) -> LookupResult<Option<ProcedureEntry>> {
        Ok(self.catalog.find_procedure(code).await?)
    }

    /// # Errors
    ///
    /// Only store failures; an unknown code is `Ok(None)`.
    pub async fn lookup_medication(&self, code: &str) -> LookupResult<Option<MedicationEntry>> {
        Ok(self.catalog.find_medication(code).await?)
    }

    /// Apply the registry rules for one person on one service date.
    ///
    /// # Errors
    ///
    /// Only store failures; an unknown person is an `Ineligible` result.
    pub async fn check_eligibility(
        &self,
        doc_type: &str,
        doc_number: &str,
        service_date: NaiveDate,
    ) -> LookupResult<EligibilityResult> {
        let record = self.registry.find_person(doc_type, doc_number).await?;
        let result = EligibilityVerifier::evaluate(record.as_ref(), service_date);
        debug!(
            person = %redact_document(doc_type, doc_number),
            %service_date,
            eligible = result.is_eligible(),
            "Eligibility checked"
        );
        Ok(result)
    }

    /// Resolve a procedure code and enforce its declared restrictions.
    ///
    /// # Errors
    ///
    /// Only store failures.
    pub async fn validate_procedure(
        &self,
        code: &str,
        sex: Option<Sex>,
        setting: Option<CareSetting>,
    ) -> LookupResult<ProcedureCheck> {
        let Some(entry) = self.lookup_procedure(code).await? else {
            return Ok(ProcedureCheck::NotFound);
        };
        if !entry.enabled {
            return Ok(ProcedureCheck::Disabled(entry));
        }
        Ok(match entry.check_restrictions(sex, setting) {
            Ok(()) => ProcedureCheck::Valid(entry),
            Err(violation) => ProcedureCheck::RestrictionMismatch(violation),
        })
    }

    /// # Errors
    ///
    /// Only store failures.
    pub async fn validate_medication(&self, code: &str) -> LookupResult<MedicationCheck> {
        Ok(match self.lookup_medication(code).await? {
            None => MedicationCheck::NotFound,
            Some(entry) if !entry.enabled => MedicationCheck::Disabled(entry),
            Some(entry) => MedicationCheck::Valid(entry),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::eligibility::InMemoryEligibilityRegistry;
    use crate::models::{SettingRestriction, SexRestriction};

    fn service() -> LookupService {
        let catalog = InMemoryCatalog::new();
        catalog.upsert_procedure(ProcedureEntry {
            code: "890201".to_string(),
            description: "Consulta de primera vez por medicina general".to_string(),
            sex_restriction: SexRestriction::Either,
            setting_restriction: SettingRestriction::Either,
            surgical: false,
            enabled: true,
        });
        catalog.upsert_procedure(ProcedureEntry {
            code: "637301".to_string(),
            description: "Vasectomia".to_string(),
            sex_restriction: SexRestriction::MaleOnly,
            setting_restriction: SettingRestriction::AmbulatoryOnly,
            surgical: true,
            enabled: true,
        });
        catalog.upsert_procedure(ProcedureEntry {
            code: "990101".to_string(),
            description: "Retired code".to_string(),
            sex_restriction: SexRestriction::Either,
            setting_restriction: SettingRestriction::Either,
            surgical: false,
            enabled: false,
        });
        LookupService::new(Arc::new(catalog), Arc::new(InMemoryEligibilityRegistry::new()))
    }

    #[tokio::test]
    async fn test_validate_procedure_outcomes() {
        let lookup = service();

        assert!(matches!(
            lookup.validate_procedure("890201", Some(Sex::Female), None).await.unwrap(),
            ProcedureCheck::Valid(_)
        ));
        assert_eq!(
            lookup.validate_procedure("999999", None, None).await.unwrap(),
            ProcedureCheck::NotFound
        );
        assert!(matches!(
            lookup.validate_procedure("990101", None, None).await.unwrap(),
            ProcedureCheck::Disabled(_)
        ));

        match lookup
            .validate_procedure("637301", Some(Sex::Female), Some(CareSetting::Ambulatory))
            .await
            .unwrap()
        {
            ProcedureCheck::RestrictionMismatch(violation) => {
                assert_eq!(violation.causal_code(), "PE0101");
            }
            other => panic!("expected restriction mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_person_is_ineligible_not_error() {
        let lookup = service();
        let result = lookup
            .check_eligibility("CC", "1", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .await
            .unwrap();
        assert!(!result.is_eligible());
    }
}
