use chrono::{DateTime, Utc};
use claims_normalizer::{PersonRef, ServiceKind, ServiceRecordId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespace of the deterministic finding identifiers
const FINDING_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_3a0e_9b2d_4c57_8e41_d2a7_5b90_c3e8);

/// Category of a candidate deduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeductionCategory {
    /// Unknown or disabled catalog code
    CatalogValidation,
    /// Sex or care-setting restriction not satisfied
    RestrictionMismatch,
    /// Mandatory principal diagnosis absent
    MissingDiagnosis,
}

impl DeductionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CatalogValidation => "catalog-validation",
            Self::RestrictionMismatch => "restriction-mismatch",
            Self::MissingDiagnosis => "missing-diagnosis",
        }
    }

    pub fn base_priority(self) -> ReviewPriority {
        match self {
            Self::CatalogValidation => ReviewPriority::High,
            Self::RestrictionMismatch => ReviewPriority::Medium,
            Self::MissingDiagnosis => ReviewPriority::Low,
        }
    }
}

impl fmt::Display for DeductionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review priority, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Whether a deduction has been handed to an auditor
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AssignmentState {
    #[default]
    Unassigned,
    Assigned {
        auditor_id: String,
        proposal_id: Uuid,
        assigned_at: DateTime<Utc>,
    },
}

impl AssignmentState {
    pub fn is_assigned(&self) -> bool {
        matches!(self, Self::Assigned { .. })
    }
}

/// Person-scoped finding: the claim cannot proceed to audit for these services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReturn {
    pub id: Uuid,
    pub invoice_number: String,
    pub batch_version: u32,
    pub person: PersonRef,
    pub causal_code: String,
    pub reason: String,
    /// Every service of the person, superseding any deduction on them
    pub service_ids: Vec<ServiceRecordId>,
    pub created_at: DateTime<Utc>,
}

/// Service-scoped monetary finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDeduction {
    pub id: Uuid,
    pub invoice_number: String,
    pub batch_version: u32,
    pub service_id: ServiceRecordId,
    pub service_kind: ServiceKind,
    pub category: DeductionCategory,
    pub causal_code: String,
    pub reason: String,
    pub billed_amount: Decimal,
    /// Never above `billed_amount`
    pub suggested_amount: Decimal,
    pub priority: ReviewPriority,
    pub assignment: AssignmentState,
    pub created_at: DateTime<Utc>,
}

/// Deterministic id of a deduction; re-evaluating an unchanged service of the
/// same batch version yields the same id.
pub fn deduction_id(
    invoice_number: &str,
    batch_version: u32,
    service_id: &ServiceRecordId,
    category: DeductionCategory,
) -> Uuid {
    let name = format!("{invoice_number}|{batch_version}|{service_id}|{category}");
    Uuid::new_v5(&FINDING_NAMESPACE, name.as_bytes())
}

pub fn return_id(invoice_number: &str, batch_version: u32, person: &PersonRef) -> Uuid {
    let name = format!(
        "{invoice_number}|{batch_version}|{}-{}|return",
        person.doc_type, person.doc_number
    );
    Uuid::new_v5(&FINDING_NAMESPACE, name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduction_id_is_deterministic() {
        let person = PersonRef::new("CC", "1032456789");
        let service = ServiceRecordId::new("INV-001", &person, ServiceKind::Consultation, 2);

        let first = deduction_id("INV-001", 1, &service, DeductionCategory::CatalogValidation);
        let again = deduction_id("INV-001", 1, &service, DeductionCategory::CatalogValidation);
        let other_version = deduction_id("INV-001", 2, &service, DeductionCategory::CatalogValidation);
        let other_category =
            deduction_id("INV-001", 1, &service, DeductionCategory::MissingDiagnosis);

        assert_eq!(first, again);
        assert_ne!(first, other_version);
        assert_ne!(first, other_category);
    }

    #[test]
    fn test_priority_order() {
        assert!(ReviewPriority::Critical > ReviewPriority::High);
        assert!(ReviewPriority::Medium > ReviewPriority::Low);
        assert_eq!(
            DeductionCategory::CatalogValidation.base_priority(),
            ReviewPriority::High
        );
    }

    #[test]
    fn test_category_wire_name() {
        let json = serde_json::to_string(&DeductionCategory::RestrictionMismatch).unwrap();
        assert_eq!(json, "\"restriction-mismatch\"");
    }
}
