use async_trait::async_trait;
use dashmap::DashMap;
use error_common::StoreResult;
use std::sync::Arc;

use crate::models::{MedicationEntry, ProcedureEntry};

/// Read access to the procedure and medication catalogs
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_procedure(&self, code: &str) -> StoreResult<Option<ProcedureEntry>>;

    async fn find_medication(&self, code: &str) -> StoreResult<Option<MedicationEntry>>;
}

/// In-memory catalogs keyed by trimmed, upper-cased code
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    procedures: Arc<DashMap<String, ProcedureEntry>>,
    medications: Arc<DashMap<String, MedicationEntry>>,
}

fn code_key(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_procedure(&self, entry: ProcedureEntry) {
        self.procedures.insert(code_key(&entry.code), entry);
    }

    pub fn upsert_medication(&self, entry: MedicationEntry) {
        self.medications.insert(code_key(&entry.code), entry);
    }

    pub fn upsert_procedures(&self, entries: impl IntoIterator<Item = ProcedureEntry>) {
        for entry in entries {
            self.upsert_procedure(entry);
        }
    }

    pub fn upsert_medications(&self, entries: impl IntoIterator<Item = MedicationEntry>) {
        for entry in entries {
            self.upsert_medication(entry);
        }
    }

    pub fn procedure_count(&self) -> usize {
        self.procedures.len()
    }

    pub fn medication_count(&self) -> usize {
        self.medications.len()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn find_procedure(&self, code: &str) -> StoreResult<Option<ProcedureEntry>> {
        Ok(self
            .procedures
            .get(&code_key(code))
            .map(|entry| entry.value().clone()))
    }

    async fn find_medication(&self, code: &str) -> StoreResult<Option<MedicationEntry>> {
        Ok(self
            .medications
            .get(&code_key(code))
            .map(|entry| entry.value().clone()))
    }
}
