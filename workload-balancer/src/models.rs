use chrono::{DateTime, Utc};
use claims_normalizer::{ServiceKind, ServiceRecordId};
use config_engine::BalancerWeights;
use pre_audit_engine::{CandidateDeduction, DeductionCategory, ReviewPriority};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::InvalidTransition;

/// Kind of auditor; decides which finding categories it may take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditorRole {
    #[serde(alias = "medico", alias = "medical_auditor")]
    Medical,
    #[serde(alias = "administrativo", alias = "admin")]
    Administrative,
}

/// One member of the auditor pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditorProfile {
    pub id: String,
    pub name: Option<String>,
    pub role: AuditorRole,
    /// Category tags (`catalog-validation`) or service-kind tags (`procedure`)
    pub specializations: Vec<String>,
    pub daily_capacity: u32,
    /// Open assignments; never above `daily_capacity` once committed
    pub current_load: u32,
    /// Bumped on every load change; drives optimistic commit
    pub version: u64,
    pub mean_handling_minutes: Option<f64>,
    /// Historical share of reviewed findings that ended in a deduction
    pub deduction_rate: Option<f64>,
    pub active: bool,
}

impl AuditorProfile {
    pub fn remaining_capacity(&self) -> u32 {
        self.daily_capacity.saturating_sub(self.current_load)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.specializations
            .iter()
            .any(|s| s.trim().eq_ignore_ascii_case(tag))
    }
}

/// Snapshot of a finding as the scheduler saw it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedFinding {
    pub finding_id: Uuid,
    pub invoice_number: String,
    pub service_id: ServiceRecordId,
    pub service_kind: ServiceKind,
    pub category: DeductionCategory,
    pub priority: ReviewPriority,
    pub suggested_amount: Decimal,
}

impl From<&CandidateDeduction> for ProposedFinding {
    fn from(deduction: &CandidateDeduction) -> Self {
        Self {
            finding_id: deduction.id,
            invoice_number: deduction.invoice_number.clone(),
            service_id: deduction.service_id.clone(),
            service_kind: deduction.service_kind,
            category: deduction.category,
            priority: deduction.priority,
            suggested_amount: deduction.suggested_amount,
        }
    }
}

/// One finding → auditor pairing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pairing {
    pub finding_id: Uuid,
    pub auditor_id: String,
    /// Fit score at generation time; zero for supervisor-supplied pairings
    pub score: f64,
}

impl Pairing {
    pub fn manual(finding_id: Uuid, auditor_id: impl Into<String>) -> Self {
        Self {
            finding_id,
            auditor_id: auditor_id.into(),
            score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedReason {
    /// No auditor's role permits the finding's category
    NoEligibleAuditor,
    /// Every eligible auditor is at its capacity ceiling
    CapacityExhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnassignedFinding {
    pub finding_id: Uuid,
    pub reason: UnassignedReason,
}

/// Workflow status of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    PendingApproval,
    Approved,
    Modified,
    Rejected,
    Executed,
    Expired,
}

impl ProposalStatus {
    /// Closed transition table of the approval workflow
    pub fn can_transition_to(self, next: ProposalStatus) -> bool {
        use ProposalStatus::{Approved, Executed, Expired, Modified, PendingApproval, Rejected};
        matches!(
            (self, next),
            (PendingApproval, Approved | Modified | Rejected | Expired)
                | (Approved | Modified, Executed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Executed | Self::Rejected | Self::Expired)
    }

    /// Whether the proposal still holds its findings
    pub fn is_active(self) -> bool {
        matches!(self, Self::PendingApproval | Self::Approved | Self::Modified)
    }
}

/// Append-only record of one transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    /// `None` for the creation entry
    pub from: Option<ProposalStatus>,
    pub to: ProposalStatus,
    pub actor: String,
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

/// Actor recorded for transitions the system makes on its own
pub const SYSTEM_ACTOR: &str = "system";

/// A scheduler-generated, not yet binding assignment of findings to auditors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentProposal {
    pub id: Uuid,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub weights: BalancerWeights,
    /// Every finding considered, in scheduling order
    pub findings: Vec<ProposedFinding>,
    pub assignments: Vec<Pairing>,
    pub unassigned: Vec<UnassignedFinding>,
    /// No finding could be assigned at all
    pub no_capacity: bool,
    pub balance_score: f64,
    /// Findings per eligible auditor, including auditors that got none
    pub auditor_counts: BTreeMap<String, usize>,
    /// Auditor versions observed when the pairings were validated
    pub roster_versions: BTreeMap<String, u64>,
    pub decision_log: Vec<DecisionLogEntry>,
    /// Bumped on every save; stores reject stale writes
    pub revision: u64,
}

impl AssignmentProposal {
    pub fn finding(&self, finding_id: Uuid) -> Option<&ProposedFinding> {
        self.findings.iter().find(|f| f.finding_id == finding_id)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == ProposalStatus::PendingApproval && now > self.deadline
    }

    /// Move to `to` and append the log entry.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when the table does not allow the move; the
    /// proposal is left untouched.
    pub fn record_transition(
        &mut self,
        to: ProposalStatus,
        actor: &str,
        at: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.decision_log.push(DecisionLogEntry {
            from: Some(self.status),
            to,
            actor: actor.to_string(),
            at,
            note,
        });
        self.status = to;
        Ok(())
    }

    /// Lazy expiry: move an overdue pending proposal to `EXPIRED`.
    /// Returns whether it expired now.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from [`Self::record_transition`].
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> Result<bool, InvalidTransition> {
        if !self.is_overdue(now) {
            return Ok(false);
        }
        let note = format!("approval deadline {} passed", self.deadline.to_rfc3339());
        self.record_transition(ProposalStatus::Expired, SYSTEM_ACTOR, now, Some(note))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_transition_table() {
        use ProposalStatus::*;
        assert!(PendingApproval.can_transition_to(Approved));
        assert!(PendingApproval.can_transition_to(Expired));
        assert!(Approved.can_transition_to(Executed));
        assert!(Modified.can_transition_to(Executed));

        assert!(!Expired.can_transition_to(Executed));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Executed.can_transition_to(Rejected));
        assert!(!PendingApproval.can_transition_to(Executed));
    }

    fn empty_proposal() -> (AssignmentProposal, DateTime<Utc>) {
        use chrono::TimeZone;
        let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap();
        let proposal = crate::scoring::generate_proposal(
            &[],
            &[],
            &BalancerWeights::default(),
            t0,
            chrono::Duration::hours(24),
        );
        (proposal, t0)
    }

    #[test]
    fn test_record_transition_refuses_moves_outside_the_table() {
        let (mut proposal, t0) = empty_proposal();
        proposal
            .record_transition(ProposalStatus::Expired, SYSTEM_ACTOR, t0, None)
            .unwrap();
        let log_len = proposal.decision_log.len();

        let error = proposal
            .record_transition(ProposalStatus::Executed, "sup-1", t0, None)
            .unwrap_err();

        assert_eq!(
            error,
            InvalidTransition {
                from: ProposalStatus::Expired,
                to: ProposalStatus::Executed,
            }
        );
        assert_eq!(proposal.status, ProposalStatus::Expired);
        assert_eq!(proposal.decision_log.len(), log_len);
    }

    #[test]
    fn test_expiry_only_applies_to_overdue_pending_proposals() {
        let (mut proposal, t0) = empty_proposal();
        let late = t0 + chrono::Duration::hours(25);

        assert!(!proposal.expire_if_due(t0).unwrap());
        assert!(proposal.expire_if_due(late).unwrap());
        assert_eq!(proposal.status, ProposalStatus::Expired);
        assert!(!proposal.expire_if_due(late).unwrap());
        assert_eq!(proposal.decision_log.len(), 2);
    }

    #[test]
    fn test_terminal_and_active_statuses() {
        assert!(ProposalStatus::Executed.is_terminal());
        assert!(ProposalStatus::Expired.is_terminal());
        assert!(!ProposalStatus::Approved.is_terminal());
        assert!(!ProposalStatus::Rejected.is_active());
        assert!(ProposalStatus::PendingApproval.is_active());
    }

    #[test]
    fn test_specialization_tags_ignore_case() {
        let auditor = AuditorProfile {
            id: "a-1".to_string(),
            name: None,
            role: AuditorRole::Medical,
            specializations: vec![" Procedure ".to_string()],
            daily_capacity: 10,
            current_load: 12,
            version: 0,
            mean_handling_minutes: None,
            deduction_rate: None,
            active: true,
        };
        assert!(auditor.has_tag("procedure"));
        assert_eq!(auditor.remaining_capacity(), 0);
    }
}
