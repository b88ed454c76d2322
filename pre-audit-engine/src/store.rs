use async_trait::async_trait;
use chrono::{DateTime, Utc};
use error_common::{StoreError, StoreResult};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{AssignmentState, CandidateDeduction, CandidateReturn};

/// One committed pairing of a deduction to an auditor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRecord {
    pub finding_id: Uuid,
    pub auditor_id: String,
    pub proposal_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}

/// Effect of replacing a batch's findings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaceSummary {
    pub returns: usize,
    pub deductions: usize,
    /// Deductions whose id survived and kept their assignment state
    pub carried_over: usize,
    /// Prior deductions no longer produced by the rules
    pub removed: usize,
}

/// Persistence of findings, replaced per batch as a unit
#[async_trait]
pub trait FindingStore: Send + Sync {
    async fn replace_batch_findings(
        &self,
        invoice_number: &str,
        returns: Vec<CandidateReturn>,
        deductions: Vec<CandidateDeduction>,
    ) -> StoreResult<ReplaceSummary>;

    async fn returns_for_batch(&self, invoice_number: &str) -> StoreResult<Vec<CandidateReturn>>;

    async fn deductions_for_batch(
        &self,
        invoice_number: &str,
    ) -> StoreResult<Vec<CandidateDeduction>>;

    /// Unassigned deductions of every batch, ordered by invoice then evaluation order
    async fn unassigned_deductions(&self) -> StoreResult<Vec<CandidateDeduction>>;

    async fn get_deductions(&self, ids: &[Uuid]) -> StoreResult<Vec<CandidateDeduction>>;

    /// Mark every listed deduction assigned, or none of them
    async fn mark_assigned(&self, assignments: &[AssignmentRecord]) -> StoreResult<()>;

    /// Return every deduction assigned under `proposal_id` to the pool;
    /// returns how many were released
    async fn release_assignments(&self, proposal_id: Uuid) -> StoreResult<usize>;

    /// Drop every finding of a batch; returns how many were removed
    async fn purge_batch(&self, invoice_number: &str) -> StoreResult<usize>;
}

#[derive(Default)]
struct BatchFindings {
    returns: Vec<CandidateReturn>,
    deductions: Vec<CandidateDeduction>,
}

/// In-memory finding store; one lock makes multi-deduction marking atomic
#[derive(Clone, Default)]
pub struct InMemoryFindingStore {
    batches: Arc<RwLock<BTreeMap<String, BatchFindings>>>,
}

impl InMemoryFindingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FindingStore for InMemoryFindingStore {
    async fn replace_batch_findings(
        &self,
        invoice_number: &str,
        returns: Vec<CandidateReturn>,
        mut deductions: Vec<CandidateDeduction>,
    ) -> StoreResult<ReplaceSummary> {
        let mut batches = self.batches.write().await;
        let previous: HashMap<Uuid, AssignmentState> = batches
            .get(invoice_number)
            .map(|found| {
                found
                    .deductions
                    .iter()
                    .map(|d| (d.id, d.assignment.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let mut carried_over = 0;
        for deduction in &mut deductions {
            if let Some(state) = previous.get(&deduction.id) {
                deduction.assignment = state.clone();
                carried_over += 1;
            }
        }

        let summary = ReplaceSummary {
            returns: returns.len(),
            deductions: deductions.len(),
            carried_over,
            removed: previous.len() - carried_over,
        };
        batches.insert(
            invoice_number.to_string(),
            BatchFindings {
                returns,
                deductions,
            },
        );
        Ok(summary)
    }

    async fn returns_for_batch(&self, invoice_number: &str) -> StoreResult<Vec<CandidateReturn>> {
        Ok(self
            .batches
            .read()
            .await
            .get(invoice_number)
            .map(|found| found.returns.clone())
            .unwrap_or_default())
    }

    async fn deductions_for_batch(
        &self,
        invoice_number: &str,
    ) -> StoreResult<Vec<CandidateDeduction>> {
        Ok(self
            .batches
            .read()
            .await
            .get(invoice_number)
            .map(|found| found.deductions.clone())
            .unwrap_or_default())
    }

    async fn unassigned_deductions(&self) -> StoreResult<Vec<CandidateDeduction>> {
        Ok(self
            .batches
            .read()
            .await
            .values()
            .flat_map(|found| found.deductions.iter())
            .filter(|d| !d.assignment.is_assigned())
            .cloned()
            .collect())
    }

    async fn get_deductions(&self, ids: &[Uuid]) -> StoreResult<Vec<CandidateDeduction>> {
        let batches = self.batches.read().await;
        let by_id: HashMap<Uuid, &CandidateDeduction> = batches
            .values()
            .flat_map(|found| found.deductions.iter())
            .map(|d| (d.id, d))
            .collect();
        ids.iter()
            .map(|id| {
                by_id
                    .get(id)
                    .map(|d| (*d).clone())
                    .ok_or_else(|| StoreError::not_found("finding", id.to_string()))
            })
            .collect()
    }

    async fn mark_assigned(&self, assignments: &[AssignmentRecord]) -> StoreResult<()> {
        let mut batches = self.batches.write().await;

        // Validate everything before touching anything
        let mut locations = Vec::with_capacity(assignments.len());
        let mut seen = HashSet::new();
        for assignment in assignments {
            if !seen.insert(assignment.finding_id) {
                return Err(StoreError::Conflict(format!(
                    "finding {} listed twice",
                    assignment.finding_id
                )));
            }
            let location = batches.iter().find_map(|(invoice, found)| {
                found
                    .deductions
                    .iter()
                    .position(|d| d.id == assignment.finding_id)
                    .map(|index| (invoice.clone(), index))
            });
            let (invoice, index) = location.ok_or_else(|| {
                StoreError::not_found("finding", assignment.finding_id.to_string())
            })?;
            let already = batches
                .get(&invoice)
                .and_then(|found| found.deductions.get(index))
                .is_some_and(|d| d.assignment.is_assigned());
            if already {
                return Err(StoreError::Conflict(format!(
                    "finding {} is already assigned",
                    assignment.finding_id
                )));
            }
            locations.push((invoice, index, assignment));
        }

        for (invoice, index, assignment) in locations {
            if let Some(deduction) = batches
                .get_mut(&invoice)
                .and_then(|found| found.deductions.get_mut(index))
            {
                deduction.assignment = AssignmentState::Assigned {
                    auditor_id: assignment.auditor_id.clone(),
                    proposal_id: assignment.proposal_id,
                    assigned_at: assignment.assigned_at,
                };
            }
        }
        Ok(())
    }

    async fn release_assignments(&self, proposal_id: Uuid) -> StoreResult<usize> {
        let mut batches = self.batches.write().await;
        let mut released = 0;
        for deduction in batches.values_mut().flat_map(|found| found.deductions.iter_mut()) {
            let owned = matches!(
                &deduction.assignment,
                AssignmentState::Assigned { proposal_id: owner, .. } if *owner == proposal_id
            );
            if owned {
                deduction.assignment = AssignmentState::Unassigned;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn purge_batch(&self, invoice_number: &str) -> StoreResult<usize> {
        Ok(self
            .batches
            .write()
            .await
            .remove(invoice_number)
            .map_or(0, |found| found.returns.len() + found.deductions.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use claims_normalizer::{PersonRef, ServiceKind, ServiceRecordId};
    use rust_decimal::Decimal;

    use crate::models::{deduction_id, DeductionCategory};

    fn deduction(invoice: &str, consecutive: u64) -> CandidateDeduction {
        let person = PersonRef::new("CC", "1032456789");
        let service_id = ServiceRecordId::new(invoice, &person, ServiceKind::Procedure, consecutive);
        let category = DeductionCategory::CatalogValidation;
        CandidateDeduction {
            id: deduction_id(invoice, 1, &service_id, category),
            invoice_number: invoice.to_string(),
            batch_version: 1,
            service_id,
            service_kind: ServiceKind::Procedure,
            category,
            causal_code: "FA5701".to_string(),
            reason: "unknown code".to_string(),
            billed_amount: Decimal::from(1000),
            suggested_amount: Decimal::from(1000),
            priority: category.base_priority(),
            assignment: AssignmentState::Unassigned,
            created_at: Utc::now(),
        }
    }

    fn record(finding_id: Uuid, proposal_id: Uuid) -> AssignmentRecord {
        AssignmentRecord {
            finding_id,
            auditor_id: "aud-1".to_string(),
            proposal_id,
            assigned_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_mark_assigned_is_all_or_nothing() {
        let store = InMemoryFindingStore::new();
        let (first, second) = (deduction("INV-1", 1), deduction("INV-1", 2));
        store
            .replace_batch_findings("INV-1", Vec::new(), vec![first.clone(), second.clone()])
            .await
            .unwrap();
        let proposal = Uuid::new_v4();
        store.mark_assigned(&[record(first.id, proposal)]).await.unwrap();

        let result = store
            .mark_assigned(&[record(second.id, proposal), record(first.id, proposal)])
            .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        let pending = store.unassigned_deductions().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);
    }

    #[tokio::test]
    async fn test_replace_carries_assignment_of_surviving_ids() {
        let store = InMemoryFindingStore::new();
        let (kept, dropped) = (deduction("INV-2", 1), deduction("INV-2", 2));
        store
            .replace_batch_findings("INV-2", Vec::new(), vec![kept.clone(), dropped.clone()])
            .await
            .unwrap();
        store
            .mark_assigned(&[record(kept.id, Uuid::new_v4())])
            .await
            .unwrap();

        let summary = store
            .replace_batch_findings("INV-2", Vec::new(), vec![deduction("INV-2", 1)])
            .await
            .unwrap();

        assert_eq!(summary.carried_over, 1);
        assert_eq!(summary.removed, 1);
        let stored = store.deductions_for_batch("INV-2").await.unwrap();
        assert!(stored[0].assignment.is_assigned());
    }

    #[tokio::test]
    async fn test_release_only_touches_the_given_proposal() {
        let store = InMemoryFindingStore::new();
        let (a, b) = (deduction("INV-3", 1), deduction("INV-3", 2));
        store
            .replace_batch_findings("INV-3", Vec::new(), vec![a.clone(), b.clone()])
            .await
            .unwrap();
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        store
            .mark_assigned(&[record(a.id, p1), record(b.id, p2)])
            .await
            .unwrap();

        assert_eq!(store.release_assignments(p1).await.unwrap(), 1);
        let pending = store.unassigned_deductions().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, a.id);
        assert!(store.get_deductions(&[Uuid::new_v4()]).await.is_err());
    }
}
