use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use error_common::{codes, StoreResult};
use std::sync::Arc;

use crate::models::{person_key, EligibilityRecord, EligibilityResult};

/// Read access to the affiliate eligibility registry
#[async_trait]
pub trait EligibilityRegistry: Send + Sync {
    async fn find_person(
        &self,
        doc_type: &str,
        doc_number: &str,
    ) -> StoreResult<Option<EligibilityRecord>>;
}

/// In-memory registry, filled by the bulk loaders
#[derive(Clone, Default)]
pub struct InMemoryEligibilityRegistry {
    records: Arc<DashMap<String, EligibilityRecord>>,
}

impl InMemoryEligibilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by person key; the last loaded record wins
    pub fn upsert(&self, record: EligibilityRecord) {
        let key = person_key(&record.doc_type, &record.doc_number);
        self.records.insert(key, record);
    }

    pub fn upsert_many(&self, records: impl IntoIterator<Item = EligibilityRecord>) -> usize {
        records.into_iter().fold(0, |count, record| {
            self.upsert(record);
            count + 1
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl EligibilityRegistry for InMemoryEligibilityRegistry {
    async fn find_person(
        &self,
        doc_type: &str,
        doc_number: &str,
    ) -> StoreResult<Option<EligibilityRecord>> {
        Ok(self
            .records
            .get(&person_key(doc_type, doc_number))
            .map(|entry| entry.value().clone()))
    }
}

/// Eligibility rules, applied in order:
///
/// 1. person not in the registry
/// 2. status is neither active nor suspended-pending
/// 3. service date before the effective affiliation date
/// 4. service date after the termination date, when there is one
pub struct EligibilityVerifier;

impl EligibilityVerifier {
    pub fn evaluate(record: Option<&EligibilityRecord>, service_date: NaiveDate) -> EligibilityResult {
        let Some(record) = record else {
            return EligibilityResult::ineligible(
                codes::eligibility::NOT_IN_REGISTRY,
                "person not found in eligibility registry",
            );
        };

        if !record.status.permits_coverage() {
            return EligibilityResult::ineligible(
                codes::eligibility::INACTIVE_AFFILIATION,
                format!("affiliation status {:?} does not permit coverage", record.status),
            );
        }

        if service_date < record.effective_date {
            return EligibilityResult::ineligible(
                codes::eligibility::BEFORE_EFFECTIVE_DATE,
                format!(
                    "service date {service_date} is before affiliation effective date {}",
                    record.effective_date
                ),
            );
        }

        if let Some(termination) = record.termination_date {
            if service_date > termination {
                return EligibilityResult::ineligible(
                    codes::eligibility::AFTER_TERMINATION_DATE,
                    format!("service date {service_date} is after affiliation termination date {termination}"),
                );
            }
        }

        EligibilityResult::Eligible {
            regime: record.regime.kind(),
            active_insurer: record.insurer_code.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AffiliationStatus, Regime, RegimeKind};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(status: AffiliationStatus, termination: Option<NaiveDate>) -> EligibilityRecord {
        EligibilityRecord {
            insurer_code: "EPS001".to_string(),
            doc_type: "CC".to_string(),
            doc_number: "1032456789".to_string(),
            first_surname: "Gomez".to_string(),
            second_surname: None,
            first_name: "Ana".to_string(),
            second_name: None,
            birth_date: Some(date(1985, 6, 1)),
            sex: None,
            department_code: Some("11".to_string()),
            municipality_code: Some("001".to_string()),
            status,
            effective_date: date(2020, 1, 1),
            termination_date: termination,
            regime: Regime::Contributory {
                contributor_type: "C".to_string(),
                employer_id: None,
            },
        }
    }

    #[test]
    fn test_effective_date_boundary() {
        let affiliate = record(AffiliationStatus::Active, None);

        let before = EligibilityVerifier::evaluate(Some(&affiliate), date(2019, 12, 31));
        assert_eq!(
            before,
            EligibilityResult::Ineligible {
                causal_code: "DE1601".to_string(),
                reason: "service date 2019-12-31 is before affiliation effective date 2020-01-01"
                    .to_string(),
            }
        );

        let on_day = EligibilityVerifier::evaluate(Some(&affiliate), date(2020, 1, 1));
        assert_eq!(
            on_day,
            EligibilityResult::Eligible {
                regime: RegimeKind::Contributory,
                active_insurer: "EPS001".to_string(),
            }
        );
    }

    #[test]
    fn test_termination_date_is_inclusive() {
        let affiliate = record(AffiliationStatus::Active, Some(date(2023, 6, 30)));

        assert!(EligibilityVerifier::evaluate(Some(&affiliate), date(2023, 6, 30)).is_eligible());
        match EligibilityVerifier::evaluate(Some(&affiliate), date(2023, 7, 1)) {
            EligibilityResult::Ineligible { causal_code, .. } => assert_eq!(causal_code, "DE1602"),
            other => panic!("expected ineligible, got {other:?}"),
        }
    }

    #[test]
    fn test_rule_order() {
        // Status is checked before dates
        let retired = record(AffiliationStatus::Retired, None);
        match EligibilityVerifier::evaluate(Some(&retired), date(2019, 1, 1)) {
            EligibilityResult::Ineligible { causal_code, .. } => assert_eq!(causal_code, "DE1604"),
            other => panic!("expected ineligible, got {other:?}"),
        }

        match EligibilityVerifier::evaluate(None, date(2021, 1, 1)) {
            EligibilityResult::Ineligible { causal_code, .. } => assert_eq!(causal_code, "DE1603"),
            other => panic!("expected ineligible, got {other:?}"),
        }
    }

    #[test]
    fn test_suspended_pending_is_covered() {
        let affiliate = record(AffiliationStatus::SuspendedPending, None);
        assert!(EligibilityVerifier::evaluate(Some(&affiliate), date(2021, 5, 5)).is_eligible());
    }

    #[tokio::test]
    async fn test_registry_lookup_is_key_normalized() {
        let registry = InMemoryEligibilityRegistry::new();
        registry.upsert(record(AffiliationStatus::Active, None));

        let found = registry.find_person("cc", " 1032456789").await.unwrap();
        assert!(found.is_some());
        assert!(registry.find_person("TI", "1032456789").await.unwrap().is_none());
    }
}
