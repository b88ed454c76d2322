use chrono::{DateTime, Utc};
use pre_audit_engine::{AssignmentRecord, FindingStore};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use workload_balancer::{
    is_eligible, AssignmentProposal, AuditorProfile, LoadCommitError, LoadIncrement, Pairing,
    ProposalRepository, ProposalStatus, RosterRepository, SYSTEM_ACTOR,
};

use crate::decision::{Clock, Decision};
use crate::error::{WorkflowError, WorkflowResult};

/// Supervisor approval of assignment proposals.
///
/// `PENDING_APPROVAL → APPROVED | MODIFIED → EXECUTED`, or `REJECTED`, or
/// `EXPIRED` once the deadline passes. Expiry is applied lazily on every
/// read and decision. A commit increments auditor loads and marks findings
/// assigned together or not at all.
#[derive(Clone)]
pub struct ApprovalWorkflow {
    proposals: Arc<dyn ProposalRepository>,
    roster: Arc<dyn RosterRepository>,
    findings: Arc<dyn FindingStore>,
    clock: Arc<dyn Clock>,
    decisions: Arc<Mutex<()>>,
}

impl ApprovalWorkflow {
    pub fn new(
        proposals: Arc<dyn ProposalRepository>,
        roster: Arc<dyn RosterRepository>,
        findings: Arc<dyn FindingStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            proposals,
            roster,
            findings,
            clock,
            decisions: Arc::new(Mutex::new(())),
        }
    }

    /// Current state of a proposal, expiring it first when overdue.
    ///
    /// # Errors
    ///
    /// `NotFound` or a store failure.
    pub async fn get(&self, id: Uuid) -> WorkflowResult<AssignmentProposal> {
        self.load(id, self.clock.now()).await
    }

    /// Apply a supervisor decision.
    ///
    /// # Errors
    ///
    /// - `AlreadyResolved` when the proposal is no longer pending
    /// - `StaleLoad` when an auditor changed since the snapshot; call
    ///   [`Self::refresh_snapshot`] and decide again
    /// - `CapacityExceeded` or `InvalidModification` for pairings that no
    ///   longer fit
    ///
    /// The proposal stays `PENDING_APPROVAL` on every error.
    pub async fn decide(
        &self,
        id: Uuid,
        decision: Decision,
        supervisor: &str,
    ) -> WorkflowResult<AssignmentProposal> {
        let _guard = self.decisions.lock().await;
        let now = self.clock.now();
        let mut proposal = self.load(id, now).await?;
        ensure_pending(&proposal)?;

        match decision {
            Decision::Reject { reason } => {
                proposal
                    .record_transition(ProposalStatus::Rejected, supervisor, now, Some(reason))
                    .map_err(WorkflowError::transition(id))?;
                self.save(&mut proposal).await?;
                info!(proposal = %id, supervisor, "Proposal rejected");
                Ok(proposal)
            }
            Decision::Approve => {
                let pairings = proposal.assignments.clone();
                self.commit(proposal, pairings, ProposalStatus::Approved, supervisor, None, now)
                    .await
            }
            Decision::Modify { pairings, reason } => {
                if pairings.is_empty() {
                    return Err(WorkflowError::invalid(id, "replacement pairing set is empty"));
                }
                let roster = self.read_roster(id).await?;
                validate_pairings(&proposal, &pairings, &roster)?;
                proposal.roster_versions = snapshot_versions(&roster);
                proposal.assignments = pairings.clone();
                self.commit(proposal, pairings, ProposalStatus::Modified, supervisor, reason, now)
                    .await
            }
        }
    }

    /// Re-read the roster, re-check the pairings against current capacity
    /// and record fresh versions. The retry path after `StaleLoad`.
    ///
    /// # Errors
    ///
    /// `AlreadyResolved`, `CapacityExceeded` or `InvalidModification` when
    /// the pairings no longer fit, or a store failure.
    pub async fn refresh_snapshot(&self, id: Uuid) -> WorkflowResult<AssignmentProposal> {
        let _guard = self.decisions.lock().await;
        let mut proposal = self.load(id, self.clock.now()).await?;
        ensure_pending(&proposal)?;

        let roster = self.read_roster(id).await?;
        validate_pairings(&proposal, &proposal.assignments, &roster)?;
        proposal.roster_versions = snapshot_versions(&roster);
        self.save(&mut proposal).await?;
        info!(proposal = %id, auditors = roster.len(), "Proposal snapshot refreshed");
        Ok(proposal)
    }

    async fn load(&self, id: Uuid, now: DateTime<Utc>) -> WorkflowResult<AssignmentProposal> {
        let mut proposal = self
            .proposals
            .get(id)
            .await
            .map_err(|e| WorkflowError::store(e, id))?
            .ok_or(WorkflowError::NotFound(id))?;
        if proposal
            .expire_if_due(now)
            .map_err(WorkflowError::transition(id))?
        {
            self.save(&mut proposal).await?;
            info!(proposal = %id, deadline = %proposal.deadline, "Proposal expired");
        }
        Ok(proposal)
    }

    async fn save(&self, proposal: &mut AssignmentProposal) -> WorkflowResult<()> {
        let id = proposal.id;
        self.proposals
            .save(proposal)
            .await
            .map_err(|e| WorkflowError::store(e, id))
    }

    async fn read_roster(&self, id: Uuid) -> WorkflowResult<Vec<AuditorProfile>> {
        self.roster
            .list()
            .await
            .map_err(|e| WorkflowError::store(e, id))
    }

    async fn commit(
        &self,
        mut proposal: AssignmentProposal,
        pairings: Vec<Pairing>,
        decided: ProposalStatus,
        supervisor: &str,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> WorkflowResult<AssignmentProposal> {
        let id = proposal.id;
        self.ensure_unassigned(id, &pairings).await?;
        let increments = load_increments(&proposal, &pairings)?;
        // Both transitions are checked before any side effect
        proposal
            .record_transition(decided, supervisor, now, note)
            .map_err(WorkflowError::transition(id))?;
        proposal
            .record_transition(
                ProposalStatus::Executed,
                SYSTEM_ACTOR,
                now,
                Some(format!("{} pairings committed", pairings.len())),
            )
            .map_err(WorkflowError::transition(id))?;

        let updated = self
            .roster
            .commit_loads(&increments)
            .await
            .map_err(|e| commit_error(id, e))?;
        debug!(proposal = %id, auditors = updated.len(), "Auditor loads committed");
        let releases: Vec<(String, u32)> = increments
            .iter()
            .map(|i| (i.auditor_id.clone(), i.amount))
            .collect();

        let records: Vec<AssignmentRecord> = pairings
            .iter()
            .map(|p| AssignmentRecord {
                finding_id: p.finding_id,
                auditor_id: p.auditor_id.clone(),
                proposal_id: id,
                assigned_at: now,
            })
            .collect();
        if let Err(source) = self.findings.mark_assigned(&records).await {
            self.compensate(id, &releases, false).await;
            return Err(WorkflowError::store(source, id));
        }

        if let Err(error) = self.save(&mut proposal).await {
            self.compensate(id, &releases, true).await;
            return Err(error);
        }

        info!(
            proposal = %id,
            supervisor,
            decision = ?decided,
            pairings = pairings.len(),
            "Proposal executed"
        );
        Ok(proposal)
    }

    async fn ensure_unassigned(&self, id: Uuid, pairings: &[Pairing]) -> WorkflowResult<()> {
        let ids: Vec<Uuid> = pairings.iter().map(|p| p.finding_id).collect();
        let findings = self.findings.get_deductions(&ids).await.map_err(|e| {
            WorkflowError::invalid(id, format!("finding no longer available: {e}"))
        })?;
        if let Some(taken) = findings.iter().find(|f| f.assignment.is_assigned()) {
            return Err(WorkflowError::invalid(
                id,
                format!("finding {} is already assigned", taken.id),
            ));
        }
        Ok(())
    }

    async fn compensate(&self, id: Uuid, releases: &[(String, u32)], findings_marked: bool) {
        if findings_marked {
            if let Err(e) = self.findings.release_assignments(id).await {
                error!(proposal = %id, error = %e, "Could not release finding assignments");
            }
        }
        if let Err(e) = self.roster.release_loads(releases).await {
            error!(proposal = %id, error = %e, "Could not release committed auditor loads");
        }
        warn!(proposal = %id, "Partial commit rolled back");
    }
}

fn ensure_pending(proposal: &AssignmentProposal) -> WorkflowResult<()> {
    if proposal.status == ProposalStatus::PendingApproval {
        Ok(())
    } else {
        Err(WorkflowError::AlreadyResolved {
            id: proposal.id,
            status: proposal.status,
        })
    }
}

fn snapshot_versions(roster: &[AuditorProfile]) -> BTreeMap<String, u64> {
    roster.iter().map(|a| (a.id.clone(), a.version)).collect()
}

/// Pairings must name distinct findings of the proposal and eligible
/// auditors, and fit each auditor's remaining capacity.
fn validate_pairings(
    proposal: &AssignmentProposal,
    pairings: &[Pairing],
    roster: &[AuditorProfile],
) -> WorkflowResult<()> {
    let mut seen = HashSet::new();
    let mut per_auditor: BTreeMap<&str, u32> = BTreeMap::new();

    for pairing in pairings {
        if !seen.insert(pairing.finding_id) {
            return Err(WorkflowError::invalid(
                proposal.id,
                format!("finding {} is paired twice", pairing.finding_id),
            ));
        }
        let finding = proposal.finding(pairing.finding_id).ok_or_else(|| {
            WorkflowError::invalid(
                proposal.id,
                format!("finding {} is not part of the proposal", pairing.finding_id),
            )
        })?;
        let auditor = roster
            .iter()
            .find(|a| a.id == pairing.auditor_id)
            .ok_or_else(|| {
                WorkflowError::invalid(proposal.id, format!("unknown auditor {}", pairing.auditor_id))
            })?;
        if !is_eligible(auditor, finding) {
            return Err(WorkflowError::invalid(
                proposal.id,
                format!(
                    "auditor {} may not review {} findings",
                    auditor.id, finding.category
                ),
            ));
        }
        *per_auditor.entry(auditor.id.as_str()).or_insert(0) += 1;
    }

    for auditor in roster {
        let Some(count) = per_auditor.get(auditor.id.as_str()) else {
            continue;
        };
        let requested = auditor.current_load.saturating_add(*count);
        if requested > auditor.daily_capacity {
            return Err(WorkflowError::CapacityExceeded {
                id: proposal.id,
                auditor_id: auditor.id.clone(),
                capacity: auditor.daily_capacity,
                requested,
            });
        }
    }
    Ok(())
}

fn load_increments(
    proposal: &AssignmentProposal,
    pairings: &[Pairing],
) -> WorkflowResult<Vec<LoadIncrement>> {
    let mut amounts: BTreeMap<&str, u32> = BTreeMap::new();
    for pairing in pairings {
        *amounts.entry(pairing.auditor_id.as_str()).or_insert(0) += 1;
    }
    amounts
        .into_iter()
        .map(|(auditor_id, amount)| {
            let expected_version = proposal.roster_versions.get(auditor_id).copied().ok_or_else(|| {
                WorkflowError::invalid(
                    proposal.id,
                    format!("auditor {auditor_id} is not in the roster snapshot"),
                )
            })?;
            Ok(LoadIncrement {
                auditor_id: auditor_id.to_string(),
                expected_version,
                amount,
            })
        })
        .collect()
}

fn commit_error(id: Uuid, error: LoadCommitError) -> WorkflowError {
    match error {
        LoadCommitError::Stale {
            auditor_id,
            expected,
            actual,
        } => WorkflowError::StaleLoad {
            id,
            auditor_id,
            expected,
            actual,
        },
        LoadCommitError::CapacityExceeded {
            auditor_id,
            capacity,
            requested,
        } => WorkflowError::CapacityExceeded {
            id,
            auditor_id,
            capacity,
            requested,
        },
        LoadCommitError::Store(source) => WorkflowError::store(source, id),
    }
}
