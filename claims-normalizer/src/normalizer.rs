use catalog_eligibility::{parse_date, CareSetting, Sex};
use chrono::{NaiveDate, Utc};
use config_engine::NormalizerSettings;
use dashmap::DashMap;
use error_common::{codes, ErrorContext, StoreError};
use logger_redacted::{redact_document, PiiRedactor};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::document::{
    RawAncillaryService, RawCommon, RawConsultation, RawEmergencyVisit, RawHospitalization,
    RawMedication, RawNewbornCare, RawPerson, RawProcedure, RawRoot,
};
use crate::error::{NormalizeError, NormalizeResult};
use crate::models::{
    BatchStatistics, BatchStatus, ClaimBatch, PersonRecord, PersonRef, ServiceDetail, ServiceKind,
    ServiceRecord, ServiceRecordId, SourceMetadata, ValidationStatus,
};
use crate::store::ClaimStore;

/// An entry left out of the batch, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub person_index: usize,
    /// `None` when the whole person was skipped
    pub kind: Option<ServiceKind>,
    /// `None` when a whole service array was unusable
    pub entry_index: Option<usize>,
    pub code: &'static str,
    pub reason: String,
}

/// What one normalization run produced
#[derive(Debug, Clone, Serialize)]
pub struct NormalizeOutcome {
    pub batch: ClaimBatch,
    pub skipped: Vec<SkippedRecord>,
    pub chunks_written: usize,
    /// Services of an earlier version no longer present in the document
    pub stale_removed: usize,
}

/// Turns one claim document into a [`ClaimBatch`] plus flat service records.
///
/// Services are written in chunks of `chunk_size`; each chunk is committed on
/// its own, so a failure leaves earlier chunks in place and a re-run upserts
/// over them by natural key.
#[derive(Clone)]
pub struct Normalizer {
    store: Arc<dyn ClaimStore>,
    chunk_size: usize,
    redactor: PiiRedactor,
    in_flight: Arc<DashMap<String, ()>>,
}

struct InFlightGuard {
    in_flight: Arc<DashMap<String, ()>>,
    invoice: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.invoice);
    }
}

struct RootHeader<'a> {
    invoice_number: String,
    obligated_party_id: String,
    note_type: Option<String>,
    note_number: Option<String>,
    persons: &'a [Value],
}

/// Running state of one normalization pass
struct Accumulator {
    invoice: String,
    chunk_size: usize,
    chunk: Vec<ServiceRecord>,
    chunks_written: usize,
    ordinal: usize,
    keep: HashSet<ServiceRecordId>,
    statistics: BatchStatistics,
    persons: Vec<PersonRecord>,
    skipped: Vec<SkippedRecord>,
}

impl Normalizer {
    pub fn new(store: Arc<dyn ClaimStore>, settings: &NormalizerSettings, redactor: PiiRedactor) -> Self {
        Self {
            store,
            chunk_size: settings.chunk_size.max(1),
            redactor,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Parse raw bytes as JSON and normalize them.
    ///
    /// # Errors
    ///
    /// Invalid JSON is a structural error; see [`Normalizer::normalize`].
    pub async fn normalize_bytes(
        &self,
        bytes: &[u8],
        file_name: Option<&str>,
    ) -> NormalizeResult<NormalizeOutcome> {
        let document: Value = serde_json::from_slice(bytes).map_err(|e| {
            NormalizeError::structural(
                codes::structural::MALFORMED_ROOT,
                format!("document is not valid JSON: {e}"),
            )
        })?;
        self.normalize_document(&document, file_name, Some(bytes.len()))
            .await
    }

    /// # Errors
    ///
    /// Structural errors (no persons array, missing invoice or obligated
    /// party) abort before anything is written. Store failures abort the run
    /// and leave committed chunks in place. Malformed persons and services are
    /// never errors; they are returned in [`NormalizeOutcome::skipped`].
    pub async fn normalize(&self, document: &Value) -> NormalizeResult<NormalizeOutcome> {
        self.normalize_document(document, None, None).await
    }

    /// Administrative purge of a batch and its services.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn purge(&self, invoice_number: &str) -> NormalizeResult<bool> {
        let removed = self.store.purge_batch(invoice_number).await.map_err(|e| {
            NormalizeError::store(e, ErrorContext::new().with_batch_id(invoice_number))
        })?;
        if removed {
            info!(invoice = %invoice_number, "Claim batch purged");
        }
        Ok(removed)
    }

    async fn normalize_document(
        &self,
        document: &Value,
        file_name: Option<&str>,
        size_bytes: Option<usize>,
    ) -> NormalizeResult<NormalizeOutcome> {
        let root = parse_root(document)?;
        let invoice = root.invoice_number.clone();
        let context = || ErrorContext::new().with_batch_id(invoice.clone());

        let _guard = self.claim_invoice(&invoice)?;

        let canonical = serde_json::to_vec(document).map_err(|e| {
            NormalizeError::structural(codes::structural::MALFORMED_ROOT, e.to_string())
        })?;
        let digest = hex::encode(Sha256::digest(&canonical));
        let now = Utc::now();

        let existing = self
            .store
            .get_batch(&invoice)
            .await
            .map_err(|e| NormalizeError::store(e, context()))?;
        let (version, created_at) = match &existing {
            // A batch left in LOADING was interrupted; re-running resumes it
            Some(previous) if previous.status == BatchStatus::Loading => {
                warn!(invoice = %invoice, version = previous.version, "Resuming interrupted claim batch");
                (next_version(previous, &digest), previous.created_at)
            }
            Some(previous) => {
                if !previous.status.can_transition_to(BatchStatus::Loading) {
                    return Err(NormalizeError::InvalidTransition {
                        invoice: invoice.clone(),
                        from: previous.status,
                        to: BatchStatus::Loading,
                    });
                }
                (next_version(previous, &digest), previous.created_at)
            }
            None => (1, now),
        };

        let mut batch = ClaimBatch {
            invoice_number: invoice.clone(),
            obligated_party_id: root.obligated_party_id.clone(),
            note_type: root.note_type.clone(),
            note_number: root.note_number.clone(),
            status: BatchStatus::Loading,
            version,
            statistics: BatchStatistics::default(),
            source: SourceMetadata {
                file_name: file_name.map(str::to_string),
                size_bytes: size_bytes.unwrap_or(canonical.len()),
                content_digest: digest,
                received_at: now,
            },
            persons: Vec::new(),
            created_at,
            updated_at: now,
        };
        self.store
            .upsert_batch(&batch)
            .await
            .map_err(|e| NormalizeError::store(e, context()))?;

        info!(
            invoice = %invoice,
            version,
            persons = root.persons.len(),
            chunk_size = self.chunk_size,
            "Normalizing claim batch"
        );

        let mut acc = Accumulator::new(invoice.clone(), self.chunk_size);
        if let Err(error) = self.ingest_persons(&mut acc, root.persons).await {
            batch.status = BatchStatus::Error;
            batch.updated_at = Utc::now();
            if let Err(mark_error) = self.store.upsert_batch(&batch).await {
                warn!(invoice = %invoice, error = %mark_error, "Could not mark batch as failed");
            }
            return Err(error);
        }

        let stale_removed = self
            .store
            .retain_services(&invoice, &acc.keep)
            .await
            .map_err(|e| NormalizeError::store(e, context()))?;
        if stale_removed > 0 {
            info!(invoice = %invoice, stale_removed, "Removed services no longer in the document");
        }

        acc.statistics.person_count = acc.persons.len();
        acc.statistics.skipped_records = acc.skipped.len();
        batch.statistics = acc.statistics;
        batch.persons = acc.persons;
        batch.status = BatchStatus::Parsed;
        batch.updated_at = Utc::now();
        self.store
            .upsert_batch(&batch)
            .await
            .map_err(|e| NormalizeError::store(e, context()))?;

        info!(
            invoice = %invoice,
            version = batch.version,
            persons = batch.statistics.person_count,
            services = batch.statistics.total_services,
            skipped = batch.statistics.skipped_records,
            total_billed = %batch.statistics.total_billed,
            chunks = acc.chunks_written,
            "Claim batch normalized"
        );

        Ok(NormalizeOutcome {
            batch,
            skipped: acc.skipped,
            chunks_written: acc.chunks_written,
            stale_removed,
        })
    }

    fn claim_invoice(&self, invoice: &str) -> NormalizeResult<InFlightGuard> {
        if self.in_flight.insert(invoice.to_string(), ()).is_some() {
            return Err(NormalizeError::store(
                StoreError::Conflict(format!("batch {invoice} is already being normalized")),
                ErrorContext::new().with_batch_id(invoice),
            ));
        }
        Ok(InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            invoice: invoice.to_string(),
        })
    }

    async fn ingest_persons(&self, acc: &mut Accumulator, persons: &[Value]) -> NormalizeResult<()> {
        for (person_index, raw) in persons.iter().enumerate() {
            let (person, services) = match parse_person(person_index, raw) {
                Ok(parsed) => parsed,
                Err(reason) => {
                    warn!(
                        invoice = %acc.invoice,
                        record_index = person_index,
                        reason = %self.redactor.redact(&reason),
                        "Skipping malformed person"
                    );
                    acc.statistics.skipped_persons += 1;
                    acc.skip(person_index, None, None, reason);
                    continue;
                }
            };
            debug!(
                invoice = %acc.invoice,
                record_index = person_index,
                person = %redact_document(&person.person.doc_type, &person.person.doc_number),
                "Person parsed"
            );
            let person = self.ingest_services(acc, person, services).await?;
            acc.persons.push(person);
        }
        self.flush(acc).await
    }

    async fn ingest_services(
        &self,
        acc: &mut Accumulator,
        mut person: PersonRecord,
        services: Option<&Value>,
    ) -> NormalizeResult<PersonRecord> {
        let services = match services {
            None | Some(Value::Null) => return Ok(person),
            Some(Value::Object(map)) => map,
            Some(_) => {
                acc.skip(person.index, None, None, "services must be an object".to_string());
                return Ok(person);
            }
        };

        for kind in ServiceKind::ALL {
            let entries = match kind.document_keys().iter().find_map(|key| services.get(*key)) {
                None | Some(Value::Null) => continue,
                Some(Value::Array(entries)) => entries,
                Some(_) => {
                    acc.skip(person.index, Some(kind), None, format!("{kind} must be an array"));
                    continue;
                }
            };

            for (position, entry) in entries.iter().enumerate() {
                let record = build_service(kind, entry, &acc.invoice, &person, position, acc.ordinal)
                    .and_then(|record| {
                        if acc.keep.contains(&record.id) {
                            Err(format!("duplicate consecutive {}", record.consecutive))
                        } else {
                            Ok(record)
                        }
                    });
                match record {
                    Ok(record) => {
                        acc.ordinal += 1;
                        *person.count_by_type.entry(kind).or_insert(0) += 1;
                        person.service_count += 1;
                        person.total_billed += record.billed_amount;
                        acc.statistics.record(kind, record.billed_amount);
                        acc.keep.insert(record.id.clone());
                        acc.chunk.push(record);
                        if acc.chunk.len() >= acc.chunk_size {
                            self.flush(acc).await?;
                        }
                    }
                    Err(reason) => {
                        warn!(
                            invoice = %acc.invoice,
                            record_index = person.index,
                            kind = %kind,
                            entry = position,
                            reason = %self.redactor.redact(&reason),
                            "Skipping malformed service"
                        );
                        acc.skip(person.index, Some(kind), Some(position), reason);
                    }
                }
            }
        }
        Ok(person)
    }

    async fn flush(&self, acc: &mut Accumulator) -> NormalizeResult<()> {
        if acc.chunk.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::take(&mut acc.chunk);
        let size = chunk.len();
        self.store
            .upsert_services(&acc.invoice, chunk)
            .await
            .map_err(|e| {
                NormalizeError::store(
                    e,
                    ErrorContext::new()
                        .with_batch_id(acc.invoice.clone())
                        .with_record_index(acc.ordinal)
                        .add_context("chunk", acc.chunks_written.to_string()),
                )
            })?;
        acc.chunks_written += 1;
        debug!(invoice = %acc.invoice, chunk = acc.chunks_written, size, "Service chunk committed");
        Ok(())
    }
}

impl Accumulator {
    fn new(invoice: String, chunk_size: usize) -> Self {
        Self {
            invoice,
            chunk_size,
            chunk: Vec::with_capacity(chunk_size),
            chunks_written: 0,
            ordinal: 0,
            keep: HashSet::new(),
            statistics: BatchStatistics::default(),
            persons: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn skip(
        &mut self,
        person_index: usize,
        kind: Option<ServiceKind>,
        entry_index: Option<usize>,
        reason: String,
    ) {
        self.skipped.push(SkippedRecord {
            person_index,
            kind,
            entry_index,
            code: codes::structural::MALFORMED_RECORD,
            reason,
        });
    }
}

fn next_version(previous: &ClaimBatch, digest: &str) -> u32 {
    if previous.source.content_digest == digest {
        previous.version
    } else {
        previous.version.saturating_add(1)
    }
}

fn parse_root(document: &Value) -> NormalizeResult<RootHeader<'_>> {
    if !document.is_object() {
        return Err(NormalizeError::structural(
            codes::structural::MALFORMED_ROOT,
            "root must be a JSON object",
        ));
    }
    let raw = RawRoot::deserialize(document).map_err(|e| {
        NormalizeError::structural(codes::structural::MALFORMED_ROOT, e.to_string())
    })?;
    if raw.persons.is_none() {
        return Err(NormalizeError::structural(
            codes::structural::MISSING_PERSONS,
            "root has no persons array",
        ));
    }
    let invoice_number = non_empty(raw.invoice_number).ok_or_else(|| {
        NormalizeError::structural(codes::structural::MISSING_ROOT_FIELD, "invoiceNumber is required")
    })?;
    let obligated_party_id = non_empty(raw.obligated_party_id).ok_or_else(|| {
        NormalizeError::structural(
            codes::structural::MISSING_ROOT_FIELD,
            "obligatedPartyId is required",
        )
    })?;

    // Borrow the array from the document rather than the deserialized copy
    let persons = ["persons", "usuarios"]
        .iter()
        .find_map(|key| document.get(*key).and_then(Value::as_array))
        .map_or(&[][..], Vec::as_slice);

    Ok(RootHeader {
        invoice_number,
        obligated_party_id,
        note_type: non_empty(raw.note_type),
        note_number: non_empty(raw.note_number),
        persons,
    })
}

fn parse_person(index: usize, raw: &Value) -> Result<(PersonRecord, Option<&Value>), String> {
    let person = RawPerson::deserialize(raw).map_err(|e| format!("malformed person: {e}"))?;
    let doc_type = non_empty(person.document_type).ok_or("person has no document type")?;
    let doc_number = non_empty(person.document_number).ok_or("person has no document number")?;

    let services = ["services", "servicios"]
        .iter()
        .find_map(|key| raw.get(*key));

    let record = PersonRecord {
        index,
        person: PersonRef::new(&doc_type, &doc_number),
        user_type: non_empty(person.user_type),
        birth_date: person.birth_date.as_deref().and_then(parse_date),
        sex: person.sex.as_deref().and_then(Sex::parse),
        residence_country: non_empty(person.residence_country),
        residence_municipality: non_empty(person.residence_municipality),
        residence_zone: non_empty(person.residence_zone),
        count_by_type: BTreeMap::new(),
        service_count: 0,
        total_billed: Decimal::ZERO,
    };
    Ok((record, services))
}

/// Shared fields after conversion
struct Common {
    provider_id: String,
    billed_amount: Decimal,
    principal_diagnosis: Option<String>,
    related_diagnoses: Vec<String>,
    professional_id: Option<String>,
    consecutive: Option<u64>,
}

fn convert_common(raw: RawCommon, amount_required: bool) -> Result<Common, String> {
    let provider_id = required(raw.provider_id, "providerId")?;
    let billed_amount = match raw.billed_amount {
        Some(value) if !value.is_null() => decimal_value(&value, "billedAmount")?,
        _ if amount_required => return Err("billedAmount is required".to_string()),
        _ => Decimal::ZERO,
    };
    let mut related_diagnoses: Vec<String> = raw
        .related_diagnoses
        .unwrap_or_default()
        .into_iter()
        .filter_map(|code| non_empty(Some(code)))
        .collect();
    related_diagnoses.extend(
        [
            raw.related_diagnosis_1,
            raw.related_diagnosis_2,
            raw.related_diagnosis_3,
        ]
        .into_iter()
        .filter_map(non_empty),
    );
    let consecutive = match raw.consecutive {
        Some(value) if !value.is_null() => Some(count_value(&value, "consecutive")?),
        _ => None,
    };

    Ok(Common {
        provider_id,
        billed_amount,
        principal_diagnosis: non_empty(raw.principal_diagnosis),
        related_diagnoses,
        professional_id: non_empty(raw.professional_id),
        consecutive,
    })
}

fn build_service(
    kind: ServiceKind,
    entry: &Value,
    invoice: &str,
    person: &PersonRecord,
    position: usize,
    ordinal: usize,
) -> Result<ServiceRecord, String> {
    if !entry.is_object() {
        return Err("service entry must be an object".to_string());
    }
    let malformed = |e: serde_json::Error| format!("malformed {kind}: {e}");

    let (common, service_date, detail, recorded_sex) = match kind {
        ServiceKind::Consultation => {
            let raw = RawConsultation::deserialize(entry).map_err(malformed)?;
            let detail = ServiceDetail::Consultation {
                consultation_code: required(raw.consultation_code, "consultationCode")?,
                purpose: non_empty(raw.purpose),
                modality: non_empty(raw.modality),
            };
            let date = required_date(raw.service_date, "serviceDate")?;
            (convert_common(raw.common, true)?, date, detail, person.sex)
        }
        ServiceKind::Procedure => {
            let raw = RawProcedure::deserialize(entry).map_err(malformed)?;
            let detail = ServiceDetail::Procedure {
                procedure_code: required(raw.procedure_code, "procedureCode")?,
                care_setting: raw.care_setting.as_deref().and_then(CareSetting::parse),
                authorization_number: non_empty(raw.authorization_number),
            };
            let date = required_date(raw.service_date, "serviceDate")?;
            (convert_common(raw.common, true)?, date, detail, person.sex)
        }
        ServiceKind::Medication => {
            let raw = RawMedication::deserialize(entry).map_err(malformed)?;
            let quantity = raw
                .quantity
                .as_ref()
                .filter(|v| !v.is_null())
                .ok_or_else(|| "quantity is required".to_string())
                .and_then(|v| decimal_value(v, "quantity"))?;
            let detail = ServiceDetail::Medication {
                drug_code: required(raw.drug_code, "drugCode")?,
                drug_name: non_empty(raw.drug_name),
                quantity,
                unit_value: optional(raw.unit_value.as_ref(), |v| decimal_value(v, "unitValue"))?,
                treatment_days: optional(raw.treatment_days.as_ref(), |v| {
                    small_count(v, "treatmentDays")
                })?,
            };
            let date = required_date(raw.service_date, "serviceDate")?;
            (convert_common(raw.common, true)?, date, detail, person.sex)
        }
        ServiceKind::EmergencyVisit => {
            let raw = RawEmergencyVisit::deserialize(entry).map_err(malformed)?;
            let date = required_date(raw.service_date, "serviceDate")?;
            let discharge_date = optional_date(raw.discharge_date, "dischargeDate")?;
            if discharge_date.is_some_and(|discharge| discharge < date) {
                return Err("discharge date precedes admission date".to_string());
            }
            let detail = ServiceDetail::EmergencyVisit {
                discharge_date,
                discharge_condition: non_empty(raw.discharge_condition),
            };
            (convert_common(raw.common, false)?, date, detail, person.sex)
        }
        ServiceKind::Hospitalization => {
            let raw = RawHospitalization::deserialize(entry).map_err(malformed)?;
            let admission_date = required_date(raw.admission_date, "admissionDate")?;
            let discharge_date = required_date(raw.discharge_date, "dischargeDate")?;
            if discharge_date < admission_date {
                return Err("discharge date precedes admission date".to_string());
            }
            let detail = ServiceDetail::Hospitalization {
                admission_date,
                discharge_date,
                entry_route: non_empty(raw.entry_route),
            };
            (convert_common(raw.common, false)?, admission_date, detail, person.sex)
        }
        ServiceKind::AncillaryService => {
            let raw = RawAncillaryService::deserialize(entry).map_err(malformed)?;
            let detail = ServiceDetail::AncillaryService {
                technology_code: non_empty(raw.technology_code),
                technology_name: non_empty(raw.technology_name),
                service_type: non_empty(raw.service_type),
                quantity: optional(raw.quantity.as_ref(), |v| decimal_value(v, "quantity"))?,
            };
            let date = required_date(raw.service_date, "serviceDate")?;
            (convert_common(raw.common, true)?, date, detail, person.sex)
        }
        ServiceKind::NewbornCare => {
            let raw = RawNewbornCare::deserialize(entry).map_err(malformed)?;
            let birth_date = required_date(raw.birth_date, "birthDate")?;
            let sex = raw.sex.as_deref().and_then(Sex::parse);
            let detail = ServiceDetail::NewbornCare {
                birth_date,
                gestational_age_weeks: optional(raw.gestational_age_weeks.as_ref(), |v| {
                    small_count(v, "gestationalAgeWeeks")
                })?,
                sex,
                weight_grams: optional(raw.weight_grams.as_ref(), |v| {
                    small_count(v, "weightGrams")
                })?,
                discharge_date: optional_date(raw.discharge_date, "dischargeDate")?,
            };
            (convert_common(raw.common, false)?, birth_date, detail, sex)
        }
    };

    let consecutive = match common.consecutive {
        Some(consecutive) => consecutive,
        None => u64::try_from(position + 1).map_err(|e| e.to_string())?,
    };

    Ok(ServiceRecord {
        id: ServiceRecordId::new(invoice, &person.person, kind, consecutive),
        invoice_number: invoice.to_string(),
        person: person.person.clone(),
        ordinal,
        consecutive,
        provider_id: common.provider_id,
        service_date,
        billed_amount: common.billed_amount,
        principal_diagnosis: common.principal_diagnosis,
        related_diagnoses: common.related_diagnoses,
        professional_id: common.professional_id,
        recorded_sex,
        detail,
        validation_status: ValidationStatus::Pending,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &str) -> Result<String, String> {
    non_empty(value).ok_or_else(|| format!("{field} is required"))
}

fn required_date(value: Option<String>, field: &str) -> Result<NaiveDate, String> {
    optional_date(value, field)?.ok_or_else(|| format!("{field} is required"))
}

fn optional_date(value: Option<String>, field: &str) -> Result<Option<NaiveDate>, String> {
    match non_empty(value) {
        None => Ok(None),
        Some(text) => parse_date(&text)
            .map(Some)
            .ok_or_else(|| format!("{field} '{text}' is not a valid date")),
    }
}

fn optional<T>(
    value: Option<&Value>,
    convert: impl FnOnce(&Value) -> Result<T, String>,
) -> Result<Option<T>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => convert(value).map(Some),
    }
}

/// Money and quantities: a JSON number or a numeric string, never negative
fn decimal_value(value: &Value, field: &str) -> Result<Decimal, String> {
    let text = match value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_string(),
        _ => return Err(format!("{field} must be a number")),
    };
    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| format!("{field} '{text}' is not a number"))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(format!("{field} must not be negative"));
    }
    Ok(amount)
}

fn count_value(value: &Value, field: &str) -> Result<u64, String> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| format!("{field} must be a non-negative integer"))
}

fn small_count(value: &Value, field: &str) -> Result<u32, String> {
    u32::try_from(count_value(value, field)?).map_err(|_| format!("{field} is out of range"))
}
