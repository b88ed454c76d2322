use async_trait::async_trait;
use dashmap::DashMap;
use error_common::{StoreError, StoreResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::models::{ClaimBatch, ServiceRecord, ServiceRecordId, ValidationStatus};

/// Output sink of the normalizer and source of the rule engine.
///
/// Services are upserted by natural key so a re-run converges instead of
/// duplicating; every method is one independent commit.
#[async_trait]
pub trait ClaimStore: Send + Sync {
    async fn get_batch(&self, invoice_number: &str) -> StoreResult<Option<ClaimBatch>>;

    async fn upsert_batch(&self, batch: &ClaimBatch) -> StoreResult<()>;

    /// Commit one chunk of services of a single batch
    async fn upsert_services(&self, invoice_number: &str, chunk: Vec<ServiceRecord>)
        -> StoreResult<()>;

    /// Remove the batch's services whose id is not in `keep`; returns how many went
    async fn retain_services(
        &self,
        invoice_number: &str,
        keep: &HashSet<ServiceRecordId>,
    ) -> StoreResult<usize>;

    /// Services of a batch in document order
    async fn services_for_batch(&self, invoice_number: &str) -> StoreResult<Vec<ServiceRecord>>;

    async fn update_validation_statuses(
        &self,
        invoice_number: &str,
        updates: &[(ServiceRecordId, ValidationStatus)],
    ) -> StoreResult<()>;

    /// Delete a batch and its services; false when it did not exist
    async fn purge_batch(&self, invoice_number: &str) -> StoreResult<bool>;
}

/// DashMap-backed claim store
#[derive(Clone, Default)]
pub struct InMemoryClaimStore {
    batches: Arc<DashMap<String, ClaimBatch>>,
    services: Arc<DashMap<String, HashMap<ServiceRecordId, ServiceRecord>>>,
}

impl InMemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service_count(&self, invoice_number: &str) -> usize {
        self.services
            .get(invoice_number)
            .map_or(0, |services| services.len())
    }
}

#[async_trait]
impl ClaimStore for InMemoryClaimStore {
    async fn get_batch(&self, invoice_number: &str) -> StoreResult<Option<ClaimBatch>> {
        Ok(self
            .batches
            .get(invoice_number)
            .map(|batch| batch.value().clone()))
    }

    async fn upsert_batch(&self, batch: &ClaimBatch) -> StoreResult<()> {
        self.batches
            .insert(batch.invoice_number.clone(), batch.clone());
        Ok(())
    }

    async fn upsert_services(
        &self,
        invoice_number: &str,
        chunk: Vec<ServiceRecord>,
    ) -> StoreResult<()> {
        if let Some(stray) = chunk.iter().find(|s| s.invoice_number != invoice_number) {
            return Err(StoreError::Conflict(format!(
                "service {} does not belong to batch {invoice_number}",
                stray.id
            )));
        }
        let mut services = self.services.entry(invoice_number.to_string()).or_default();
        for service in chunk {
            services.insert(service.id.clone(), service);
        }
        Ok(())
    }

    async fn retain_services(
        &self,
        invoice_number: &str,
        keep: &HashSet<ServiceRecordId>,
    ) -> StoreResult<usize> {
        let Some(mut services) = self.services.get_mut(invoice_number) else {
            return Ok(0);
        };
        let before = services.len();
        services.retain(|id, _| keep.contains(id));
        Ok(before - services.len())
    }

    async fn services_for_batch(&self, invoice_number: &str) -> StoreResult<Vec<ServiceRecord>> {
        let mut services: Vec<ServiceRecord> = self
            .services
            .get(invoice_number)
            .map(|services| services.values().cloned().collect())
            .unwrap_or_default();
        services.sort_by_key(|service| service.ordinal);
        Ok(services)
    }

    async fn update_validation_statuses(
        &self,
        invoice_number: &str,
        updates: &[(ServiceRecordId, ValidationStatus)],
    ) -> StoreResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut services = self
            .services
            .get_mut(invoice_number)
            .ok_or_else(|| StoreError::not_found("claim batch", invoice_number))?;
        if let Some((missing, _)) = updates.iter().find(|(id, _)| !services.contains_key(id)) {
            return Err(StoreError::not_found("service record", missing.as_str()));
        }
        for (id, status) in updates {
            if let Some(service) = services.get_mut(id) {
                service.validation_status = *status;
            }
        }
        Ok(())
    }

    async fn purge_batch(&self, invoice_number: &str) -> StoreResult<bool> {
        let services = self.services.remove(invoice_number).is_some();
        let batch = self.batches.remove(invoice_number).is_some();
        Ok(batch || services)
    }
}
