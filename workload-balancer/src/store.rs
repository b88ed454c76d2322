use async_trait::async_trait;
use dashmap::DashMap;
use error_common::{StoreError, StoreResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{AssignmentProposal, AuditorProfile};

/// Load increment for one auditor, guarded by the version the caller saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadIncrement {
    pub auditor_id: String,
    pub expected_version: u64,
    pub amount: u32,
}

/// Why an all-or-nothing load commit was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadCommitError {
    #[error("Auditor {auditor_id} changed: expected version {expected}, found {actual}")]
    Stale {
        auditor_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Auditor {auditor_id} would exceed capacity {capacity} with load {requested}")]
    CapacityExceeded {
        auditor_id: String,
        capacity: u32,
        requested: u32,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Source of auditor profiles and owner of their `current_load`
#[async_trait]
pub trait RosterRepository: Send + Sync {
    /// Every profile in roster order
    async fn list(&self) -> StoreResult<Vec<AuditorProfile>>;

    /// Insert or replace a profile; the stored version is bumped
    async fn upsert(&self, profile: AuditorProfile) -> StoreResult<AuditorProfile>;

    /// Apply every increment or none; versions and ceilings are checked first
    async fn commit_loads(
        &self,
        increments: &[LoadIncrement],
    ) -> Result<Vec<AuditorProfile>, LoadCommitError>;

    /// Undo committed increments; used when a later commit step fails
    async fn release_loads(&self, releases: &[(String, u32)]) -> StoreResult<()>;
}

/// Roster behind one lock so multi-auditor commits are atomic
#[derive(Clone, Default)]
pub struct InMemoryRoster {
    auditors: Arc<RwLock<Vec<AuditorProfile>>>,
}

impl InMemoryRoster {
    pub fn new(auditors: Vec<AuditorProfile>) -> Self {
        Self {
            auditors: Arc::new(RwLock::new(auditors)),
        }
    }

    pub async fn get(&self, auditor_id: &str) -> Option<AuditorProfile> {
        self.auditors
            .read()
            .await
            .iter()
            .find(|a| a.id == auditor_id)
            .cloned()
    }
}

#[async_trait]
impl RosterRepository for InMemoryRoster {
    async fn list(&self) -> StoreResult<Vec<AuditorProfile>> {
        Ok(self.auditors.read().await.clone())
    }

    async fn upsert(&self, mut profile: AuditorProfile) -> StoreResult<AuditorProfile> {
        let mut auditors = self.auditors.write().await;
        match auditors.iter_mut().find(|a| a.id == profile.id) {
            Some(existing) => {
                profile.version = existing.version + 1;
                *existing = profile.clone();
            }
            None => auditors.push(profile.clone()),
        }
        Ok(profile)
    }

    async fn commit_loads(
        &self,
        increments: &[LoadIncrement],
    ) -> Result<Vec<AuditorProfile>, LoadCommitError> {
        let mut auditors = self.auditors.write().await;

        // Several increments may target one auditor; check the sum
        let mut requested: HashMap<&str, u32> = HashMap::new();
        for increment in increments {
            let auditor = auditors
                .iter()
                .find(|a| a.id == increment.auditor_id)
                .ok_or_else(|| StoreError::not_found("auditor", increment.auditor_id.as_str()))?;
            if auditor.version != increment.expected_version {
                return Err(LoadCommitError::Stale {
                    auditor_id: auditor.id.clone(),
                    expected: increment.expected_version,
                    actual: auditor.version,
                });
            }
            let pending = requested.entry(increment.auditor_id.as_str()).or_insert(0);
            *pending = pending.saturating_add(increment.amount);
            let total = auditor.current_load.saturating_add(*pending);
            if total > auditor.daily_capacity {
                return Err(LoadCommitError::CapacityExceeded {
                    auditor_id: auditor.id.clone(),
                    capacity: auditor.daily_capacity,
                    requested: total,
                });
            }
        }

        let mut updated = Vec::with_capacity(requested.len());
        for auditor in auditors.iter_mut() {
            if let Some(amount) = requested.get(auditor.id.as_str()) {
                auditor.current_load += amount;
                auditor.version += 1;
                updated.push(auditor.clone());
            }
        }
        Ok(updated)
    }

    async fn release_loads(&self, releases: &[(String, u32)]) -> StoreResult<()> {
        let mut auditors = self.auditors.write().await;
        for (auditor_id, amount) in releases {
            if let Some(auditor) = auditors.iter_mut().find(|a| &a.id == auditor_id) {
                auditor.current_load = auditor.current_load.saturating_sub(*amount);
                auditor.version += 1;
            }
        }
        Ok(())
    }
}

/// Proposal persistence with revision-checked saves
#[async_trait]
pub trait ProposalRepository: Send + Sync {
    async fn insert(&self, proposal: &AssignmentProposal) -> StoreResult<()>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<AssignmentProposal>>;

    /// Store a changed proposal. Fails with `Conflict` when the stored
    /// revision differs from the proposal's; on success the revision is bumped.
    async fn save(&self, proposal: &mut AssignmentProposal) -> StoreResult<()>;

    /// Every proposal ordered by creation time
    async fn list(&self) -> StoreResult<Vec<AssignmentProposal>>;
}

#[derive(Clone, Default)]
pub struct InMemoryProposalStore {
    proposals: Arc<DashMap<Uuid, AssignmentProposal>>,
}

impl InMemoryProposalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProposalRepository for InMemoryProposalStore {
    async fn insert(&self, proposal: &AssignmentProposal) -> StoreResult<()> {
        if self.proposals.contains_key(&proposal.id) {
            return Err(StoreError::Conflict(format!(
                "proposal {} already exists",
                proposal.id
            )));
        }
        self.proposals.insert(proposal.id, proposal.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<AssignmentProposal>> {
        Ok(self.proposals.get(&id).map(|p| p.value().clone()))
    }

    async fn save(&self, proposal: &mut AssignmentProposal) -> StoreResult<()> {
        let mut stored = self
            .proposals
            .get_mut(&proposal.id)
            .ok_or_else(|| StoreError::not_found("proposal", proposal.id.to_string()))?;
        if stored.revision != proposal.revision {
            return Err(StoreError::Conflict(format!(
                "proposal {} was changed concurrently",
                proposal.id
            )));
        }
        proposal.revision += 1;
        *stored = proposal.clone();
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<AssignmentProposal>> {
        let ordered: BTreeMap<_, AssignmentProposal> = self
            .proposals
            .iter()
            .map(|p| ((p.created_at, p.id), p.value().clone()))
            .collect();
        Ok(ordered.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuditorRole;

    fn auditor(id: &str, capacity: u32, load: u32) -> AuditorProfile {
        AuditorProfile {
            id: id.to_string(),
            name: None,
            role: AuditorRole::Medical,
            specializations: Vec::new(),
            daily_capacity: capacity,
            current_load: load,
            version: 3,
            mean_handling_minutes: None,
            deduction_rate: None,
            active: true,
        }
    }

    fn increment(id: &str, version: u64, amount: u32) -> LoadIncrement {
        LoadIncrement {
            auditor_id: id.to_string(),
            expected_version: version,
            amount,
        }
    }

    #[tokio::test]
    async fn test_commit_applies_all_increments() {
        let roster = InMemoryRoster::new(vec![auditor("a-1", 5, 1), auditor("a-2", 5, 0)]);

        let updated = roster
            .commit_loads(&[increment("a-1", 3, 2), increment("a-2", 3, 1)])
            .await
            .unwrap();

        assert_eq!(updated.len(), 2);
        let a1 = roster.get("a-1").await.unwrap();
        assert_eq!((a1.current_load, a1.version), (3, 4));
    }

    #[tokio::test]
    async fn test_stale_version_changes_nothing() {
        let roster = InMemoryRoster::new(vec![auditor("a-1", 5, 1), auditor("a-2", 5, 0)]);

        let result = roster
            .commit_loads(&[increment("a-1", 3, 1), increment("a-2", 2, 1)])
            .await;

        assert!(matches!(result, Err(LoadCommitError::Stale { .. })));
        assert_eq!(roster.get("a-1").await.unwrap().current_load, 1);
    }

    #[tokio::test]
    async fn test_split_increments_are_summed_against_capacity() {
        let roster = InMemoryRoster::new(vec![auditor("a-1", 3, 1)]);

        let result = roster
            .commit_loads(&[increment("a-1", 3, 1), increment("a-1", 3, 2)])
            .await;

        assert!(matches!(
            result,
            Err(LoadCommitError::CapacityExceeded { requested: 4, .. })
        ));
        assert_eq!(roster.get("a-1").await.unwrap().version, 3);
    }

    #[tokio::test]
    async fn test_release_restores_load() {
        let roster = InMemoryRoster::new(vec![auditor("a-1", 3, 2)]);
        roster
            .release_loads(&[("a-1".to_string(), 5)])
            .await
            .unwrap();
        assert_eq!(roster.get("a-1").await.unwrap().current_load, 0);
    }
}
