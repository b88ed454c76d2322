use chrono::{DateTime, Duration, Utc};
use config_engine::{BalancerSettings, BalancerWeights};
use pre_audit_engine::FindingStore;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{BalancerError, BalancerResult};
use crate::models::AssignmentProposal;
use crate::scoring::generate_proposal;
use crate::store::{ProposalRepository, RosterRepository};

/// Serialized producer of assignment proposals.
///
/// One generation at a time: two overlapping runs would both see the same
/// pending findings and propose them twice.
#[derive(Clone)]
pub struct AssignmentScheduler {
    roster: Arc<dyn RosterRepository>,
    proposals: Arc<dyn ProposalRepository>,
    findings: Arc<dyn FindingStore>,
    weights: BalancerWeights,
    approval_window: Duration,
    generation: Arc<Mutex<()>>,
}

impl AssignmentScheduler {
    /// # Errors
    ///
    /// Weights that are negative or do not sum to one.
    pub fn new(
        roster: Arc<dyn RosterRepository>,
        proposals: Arc<dyn ProposalRepository>,
        findings: Arc<dyn FindingStore>,
        settings: &BalancerSettings,
        approval_window: Duration,
    ) -> BalancerResult<Self> {
        settings
            .weights
            .validate()
            .map_err(BalancerError::InvalidWeights)?;
        Ok(Self {
            roster,
            proposals,
            findings,
            weights: settings.weights,
            approval_window,
            generation: Arc::new(Mutex::new(())),
        })
    }

    /// Generate and store a proposal for every pending finding that no
    /// active proposal holds yet.
    ///
    /// # Errors
    ///
    /// Roster, finding or proposal store failures.
    pub async fn generate(&self, now: DateTime<Utc>) -> BalancerResult<AssignmentProposal> {
        let _guard = self.generation.lock().await;

        let held = self.sweep_and_collect_held(now).await?;
        let roster = self
            .roster
            .list()
            .await
            .map_err(BalancerError::RosterUnavailable)?;
        let pending: Vec<_> = self
            .findings
            .unassigned_deductions()
            .await
            .map_err(|e| BalancerError::store(e, "read pending findings"))?
            .into_iter()
            .filter(|finding| !held.contains(&finding.id))
            .collect();

        let proposal = generate_proposal(&pending, &roster, &self.weights, now, self.approval_window);
        self.proposals
            .insert(&proposal)
            .await
            .map_err(|e| BalancerError::store(e, "insert proposal"))?;

        if proposal.no_capacity {
            warn!(
                proposal = %proposal.id,
                pending = pending.len(),
                auditors = roster.len(),
                "No finding could be assigned"
            );
        }
        info!(
            proposal = %proposal.id,
            assigned = proposal.assignments.len(),
            unassigned = proposal.unassigned.len(),
            balance_score = proposal.balance_score,
            deadline = %proposal.deadline,
            "Assignment proposal generated"
        );
        Ok(proposal)
    }

    /// Expire overdue proposals; returns the findings still held by active ones
    async fn sweep_and_collect_held(&self, now: DateTime<Utc>) -> BalancerResult<HashSet<Uuid>> {
        let proposals = self
            .proposals
            .list()
            .await
            .map_err(|e| BalancerError::store(e, "list proposals"))?;

        let mut held = HashSet::new();
        for mut proposal in proposals {
            if proposal.status.is_terminal() {
                continue;
            }
            if proposal.expire_if_due(now)? {
                self.proposals
                    .save(&mut proposal)
                    .await
                    .map_err(|e| BalancerError::store(e, "expire proposal"))?;
                info!(proposal = %proposal.id, "Proposal expired before generation");
                continue;
            }
            if proposal.status.is_active() {
                held.extend(proposal.findings.iter().map(|f| f.finding_id));
            }
        }
        Ok(held)
    }
}
