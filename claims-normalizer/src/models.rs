use catalog_eligibility::{CareSetting, Sex};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Processing status of a claim batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Loading,
    Parsed,
    Validating,
    Validated,
    Error,
}

impl BatchStatus {
    /// Closed transition table; anything not listed is rejected
    pub fn can_transition_to(self, next: BatchStatus) -> bool {
        use BatchStatus::{Error, Loading, Parsed, Validated, Validating};
        matches!(
            (self, next),
            (Loading, Parsed | Error)
                | (Parsed, Validating | Loading | Error)
                | (Validating, Validated | Error)
                | (Validated, Loading | Validating)
                | (Error, Loading)
        )
    }
}

/// The seven service variants a claim document can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Consultation,
    Procedure,
    Medication,
    EmergencyVisit,
    Hospitalization,
    AncillaryService,
    NewbornCare,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 7] = [
        ServiceKind::Consultation,
        ServiceKind::Procedure,
        ServiceKind::Medication,
        ServiceKind::EmergencyVisit,
        ServiceKind::Hospitalization,
        ServiceKind::AncillaryService,
        ServiceKind::NewbornCare,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Consultation => "consultation",
            Self::Procedure => "procedure",
            Self::Medication => "medication",
            Self::EmergencyVisit => "emergency_visit",
            Self::Hospitalization => "hospitalization",
            Self::AncillaryService => "ancillary_service",
            Self::NewbornCare => "newborn_care",
        }
    }

    /// Array key in the claim document, followed by the upstream alias
    pub fn document_keys(self) -> [&'static str; 2] {
        match self {
            Self::Consultation => ["consultations", "consultas"],
            Self::Procedure => ["procedures", "procedimientos"],
            Self::Medication => ["medications", "medicamentos"],
            Self::EmergencyVisit => ["emergencyVisits", "urgencias"],
            Self::Hospitalization => ["hospitalizations", "hospitalizacion"],
            Self::AncillaryService => ["ancillaryServices", "otrosServicios"],
            Self::NewbornCare => ["newbornCare", "recienNacidos"],
        }
    }

    /// Variants whose principal diagnosis is mandatory
    pub fn requires_diagnosis(self) -> bool {
        matches!(self, Self::Consultation | Self::Hospitalization)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit status of one service record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    #[default]
    Pending,
    Validated,
    Flagged,
    Returned,
}

/// Natural key of a service: `{invoice}/{docType}-{docNumber}/{kind}/{consecutive}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceRecordId(String);

impl ServiceRecordId {
    pub fn new(
        invoice_number: &str,
        person: &PersonRef,
        kind: ServiceKind,
        consecutive: u64,
    ) -> Self {
        Self(format!(
            "{}/{}-{}/{}/{}",
            invoice_number, person.doc_type, person.doc_number, kind, consecutive
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Document type and number identifying a person
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonRef {
    pub doc_type: String,
    pub doc_number: String,
}

impl PersonRef {
    pub fn new(doc_type: &str, doc_number: &str) -> Self {
        Self {
            doc_type: doc_type.trim().to_ascii_uppercase(),
            doc_number: doc_number.trim().to_string(),
        }
    }
}

/// Aggregates written into a batch after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub person_count: usize,
    pub total_services: usize,
    pub count_by_type: BTreeMap<ServiceKind, usize>,
    pub total_billed: Decimal,
    pub skipped_records: usize,
    pub skipped_persons: usize,
}

impl Default for BatchStatistics {
    fn default() -> Self {
        Self {
            person_count: 0,
            total_services: 0,
            count_by_type: ServiceKind::ALL.iter().map(|kind| (*kind, 0)).collect(),
            total_billed: Decimal::ZERO,
            skipped_records: 0,
            skipped_persons: 0,
        }
    }
}

impl BatchStatistics {
    pub(crate) fn record(&mut self, kind: ServiceKind, billed: Decimal) {
        *self.count_by_type.entry(kind).or_insert(0) += 1;
        self.total_services += 1;
        self.total_billed += billed;
    }
}

/// Where the raw document came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub file_name: Option<String>,
    pub size_bytes: usize,
    /// Hex SHA-256 of the canonical JSON document
    pub content_digest: String,
    pub received_at: DateTime<Utc>,
}

/// One covered individual inside a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    /// Position in the document's persons array
    pub index: usize,
    pub person: PersonRef,
    pub user_type: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub residence_country: Option<String>,
    pub residence_municipality: Option<String>,
    pub residence_zone: Option<String>,
    pub count_by_type: BTreeMap<ServiceKind, usize>,
    pub service_count: usize,
    pub total_billed: Decimal,
}

/// One root claim transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimBatch {
    pub invoice_number: String,
    pub obligated_party_id: String,
    pub note_type: Option<String>,
    pub note_number: Option<String>,
    pub status: BatchStatus,
    /// Bumped only when the content digest changes
    pub version: u32,
    pub statistics: BatchStatistics,
    pub source: SourceMetadata,
    pub persons: Vec<PersonRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClaimBatch {
    pub fn find_person(&self, person: &PersonRef) -> Option<&PersonRecord> {
        self.persons.iter().find(|p| &p.person == person)
    }
}

/// Variant-specific part of a service record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceDetail {
    Consultation {
        consultation_code: String,
        purpose: Option<String>,
        modality: Option<String>,
    },
    Procedure {
        procedure_code: String,
        care_setting: Option<CareSetting>,
        authorization_number: Option<String>,
    },
    Medication {
        drug_code: String,
        drug_name: Option<String>,
        quantity: Decimal,
        unit_value: Option<Decimal>,
        treatment_days: Option<u32>,
    },
    EmergencyVisit {
        discharge_date: Option<NaiveDate>,
        discharge_condition: Option<String>,
    },
    Hospitalization {
        admission_date: NaiveDate,
        discharge_date: NaiveDate,
        entry_route: Option<String>,
    },
    AncillaryService {
        technology_code: Option<String>,
        technology_name: Option<String>,
        service_type: Option<String>,
        quantity: Option<Decimal>,
    },
    NewbornCare {
        birth_date: NaiveDate,
        gestational_age_weeks: Option<u32>,
        sex: Option<Sex>,
        weight_grams: Option<u32>,
        discharge_date: Option<NaiveDate>,
    },
}

impl ServiceDetail {
    pub fn kind(&self) -> ServiceKind {
        match self {
            Self::Consultation { .. } => ServiceKind::Consultation,
            Self::Procedure { .. } => ServiceKind::Procedure,
            Self::Medication { .. } => ServiceKind::Medication,
            Self::EmergencyVisit { .. } => ServiceKind::EmergencyVisit,
            Self::Hospitalization { .. } => ServiceKind::Hospitalization,
            Self::AncillaryService { .. } => ServiceKind::AncillaryService,
            Self::NewbornCare { .. } => ServiceKind::NewbornCare,
        }
    }
}

/// The atomic unit of audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: ServiceRecordId,
    pub invoice_number: String,
    pub person: PersonRef,
    /// Position of the service in document order, used for stable listing
    pub ordinal: usize,
    pub consecutive: u64,
    pub provider_id: String,
    pub service_date: NaiveDate,
    pub billed_amount: Decimal,
    pub principal_diagnosis: Option<String>,
    pub related_diagnoses: Vec<String>,
    pub professional_id: Option<String>,
    /// Person's sex, or the newborn's own sex for newborn records
    pub recorded_sex: Option<Sex>,
    pub detail: ServiceDetail,
    pub validation_status: ValidationStatus,
}

impl ServiceRecord {
    pub fn kind(&self) -> ServiceKind {
        self.detail.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_status_transitions() {
        assert!(BatchStatus::Loading.can_transition_to(BatchStatus::Parsed));
        assert!(BatchStatus::Parsed.can_transition_to(BatchStatus::Validating));
        assert!(BatchStatus::Validated.can_transition_to(BatchStatus::Loading));
        assert!(BatchStatus::Error.can_transition_to(BatchStatus::Loading));

        assert!(!BatchStatus::Loading.can_transition_to(BatchStatus::Validated));
        assert!(!BatchStatus::Validating.can_transition_to(BatchStatus::Loading));
        assert!(!BatchStatus::Error.can_transition_to(BatchStatus::Parsed));
    }

    #[test]
    fn test_service_record_id_format() {
        let person = PersonRef::new(" cc", "1032456789 ");
        let id = ServiceRecordId::new("INV-001", &person, ServiceKind::Consultation, 2);
        assert_eq!(id.as_str(), "INV-001/CC-1032456789/consultation/2");
    }

    #[test]
    fn test_statistics_start_with_every_kind() {
        let stats = BatchStatistics::default();
        assert_eq!(stats.count_by_type.len(), ServiceKind::ALL.len());
        assert!(stats.count_by_type.values().all(|count| *count == 0));
    }
}
