use chrono::{DateTime, Duration, Utc};
use config_engine::BalancerWeights;
use pre_audit_engine::{CandidateDeduction, DeductionCategory, ReviewPriority};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    AssignmentProposal, AuditorProfile, AuditorRole, DecisionLogEntry, Pairing, ProposalStatus,
    ProposedFinding, UnassignedFinding, UnassignedReason, SYSTEM_ACTOR,
};

/// Roles allowed to review a finding category
pub fn allowed_roles(category: DeductionCategory) -> &'static [AuditorRole] {
    match category {
        DeductionCategory::CatalogValidation => &[AuditorRole::Administrative, AuditorRole::Medical],
        DeductionCategory::RestrictionMismatch | DeductionCategory::MissingDiagnosis => {
            &[AuditorRole::Medical]
        }
    }
}

/// Whether an auditor may take a finding at all, capacity aside
pub fn is_eligible(auditor: &AuditorProfile, finding: &ProposedFinding) -> bool {
    auditor.active && allowed_roles(finding.category).contains(&auditor.role)
}

pub fn specialization_match(auditor: &AuditorProfile, finding: &ProposedFinding) -> f64 {
    if auditor.has_tag(finding.category.as_str()) {
        1.0
    } else if auditor.has_tag(finding.service_kind.as_str()) {
        0.5
    } else {
        0.0
    }
}

pub fn priority_factor(priority: ReviewPriority) -> f64 {
    match priority {
        ReviewPriority::Low => 0.25,
        ReviewPriority::Medium => 0.5,
        ReviewPriority::High => 0.75,
        ReviewPriority::Critical => 1.0,
    }
}

/// Free share of an auditor's capacity; zero for a zero ceiling
pub fn load_factor(load: u32, capacity: u32) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    (1.0 - f64::from(load) / f64::from(capacity)).clamp(0.0, 1.0)
}

/// Speed range of a roster snapshot, used to normalize handling times
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceIndex {
    fastest: Option<f64>,
    slowest: Option<f64>,
}

impl PerformanceIndex {
    pub fn from_roster(roster: &[AuditorProfile]) -> Self {
        let times = roster
            .iter()
            .filter_map(|a| a.mean_handling_minutes)
            .filter(|m| m.is_finite() && *m >= 0.0);
        let (fastest, slowest) = times.fold((None, None), |(lo, hi): (Option<f64>, Option<f64>), m| {
            (
                Some(lo.map_or(m, |lo| lo.min(m))),
                Some(hi.map_or(m, |hi| hi.max(m))),
            )
        });
        Self { fastest, slowest }
    }

    /// 1 for the fastest, 0 for the slowest; 1 when the range is empty or flat
    pub fn speed_score(&self, auditor: &AuditorProfile) -> f64 {
        let (Some(fastest), Some(slowest), Some(minutes)) =
            (self.fastest, self.slowest, auditor.mean_handling_minutes)
        else {
            return 1.0;
        };
        let span = slowest - fastest;
        if span <= f64::EPSILON || !minutes.is_finite() {
            return 1.0;
        }
        ((slowest - minutes) / span).clamp(0.0, 1.0)
    }

    /// Mean of the speed score and the clamped historical deduction rate
    pub fn performance(&self, auditor: &AuditorProfile) -> f64 {
        let rate = auditor
            .deduction_rate
            .filter(|r| r.is_finite())
            .map_or(0.0, |r| r.clamp(0.0, 1.0));
        (self.speed_score(auditor) + rate) / 2.0
    }
}

/// Weighted fit of one auditor for one finding at a given provisional load
pub fn fit_score(
    weights: &BalancerWeights,
    auditor: &AuditorProfile,
    load: u32,
    finding: &ProposedFinding,
    performance: &PerformanceIndex,
) -> f64 {
    weights.load * load_factor(load, auditor.daily_capacity)
        + weights.specialization * specialization_match(auditor, finding)
        + weights.performance * performance.performance(auditor)
        + weights.priority * priority_factor(finding.priority)
}

/// `1 - stddev/mean` of the counts, clamped to [0, 1].
///
/// An empty set or zero assignments count as balanced.
pub fn balance_score(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if counts.is_empty() || total == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let (n, total) = (counts.len() as f64, total as f64);
    let mean = total / n;
    #[allow(clippy::cast_precision_loss)]
    let variance = counts
        .iter()
        .map(|c| {
            let diff = *c as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (1.0 - variance.sqrt() / mean).clamp(0.0, 1.0)
}

/// Scheduling order: priority descending, then suggested amount descending.
/// The sort is stable, so equal findings keep input order.
pub fn schedule_order(findings: &[CandidateDeduction]) -> Vec<ProposedFinding> {
    let mut ordered: Vec<ProposedFinding> = findings.iter().map(ProposedFinding::from).collect();
    ordered.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.suggested_amount.cmp(&a.suggested_amount))
    });
    ordered
}

/// Greedy capacity-aware assignment over a roster snapshot.
///
/// Deterministic for identical inputs. An empty result is reported through
/// `no_capacity`, never as an error.
pub fn generate_proposal(
    findings: &[CandidateDeduction],
    roster: &[AuditorProfile],
    weights: &BalancerWeights,
    now: DateTime<Utc>,
    approval_window: Duration,
) -> AssignmentProposal {
    let ordered = schedule_order(findings);
    let performance = PerformanceIndex::from_roster(roster);
    let mut loads: Vec<u32> = roster.iter().map(|a| a.current_load).collect();
    let mut counts = vec![0_usize; roster.len()];
    let mut balanced = vec![false; roster.len()];

    let mut assignments = Vec::new();
    let mut unassigned = Vec::new();

    for finding in &ordered {
        let mut best: Option<(usize, f64)> = None;
        let mut any_eligible = false;

        for (index, auditor) in roster.iter().enumerate() {
            if !is_eligible(auditor, finding) {
                continue;
            }
            any_eligible = true;
            if let Some(flag) = balanced.get_mut(index) {
                *flag = true;
            }
            let load = loads.get(index).copied().unwrap_or(auditor.current_load);
            if load >= auditor.daily_capacity {
                continue;
            }
            let score = fit_score(weights, auditor, load, finding, &performance);
            // Strict comparison keeps the earlier roster entry on ties
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((index, score));
            }
        }

        let chosen = best.and_then(|(index, score)| roster.get(index).map(|a| (index, a, score)));
        match chosen {
            Some((index, auditor, score)) => {
                if let Some(load) = loads.get_mut(index) {
                    *load += 1;
                }
                if let Some(count) = counts.get_mut(index) {
                    *count += 1;
                }
                debug!(
                    finding = %finding.finding_id,
                    auditor = %auditor.id,
                    score,
                    "Finding provisionally assigned"
                );
                assignments.push(Pairing {
                    finding_id: finding.finding_id,
                    auditor_id: auditor.id.clone(),
                    score,
                });
            }
            None => unassigned.push(UnassignedFinding {
                finding_id: finding.finding_id,
                reason: if any_eligible {
                    UnassignedReason::CapacityExhausted
                } else {
                    UnassignedReason::NoEligibleAuditor
                },
            }),
        }
    }

    let auditor_counts: BTreeMap<String, usize> = roster
        .iter()
        .zip(counts.iter().zip(balanced.iter()))
        .filter(|(_, (_, eligible))| **eligible)
        .map(|(auditor, (count, _))| (auditor.id.clone(), *count))
        .collect();
    let eligible_counts: Vec<usize> = auditor_counts.values().copied().collect();

    AssignmentProposal {
        id: Uuid::new_v4(),
        status: ProposalStatus::PendingApproval,
        created_at: now,
        deadline: now + approval_window,
        weights: *weights,
        no_capacity: !ordered.is_empty() && assignments.is_empty(),
        balance_score: balance_score(&eligible_counts),
        findings: ordered,
        assignments,
        unassigned,
        auditor_counts,
        roster_versions: roster.iter().map(|a| (a.id.clone(), a.version)).collect(),
        decision_log: vec![DecisionLogEntry {
            from: None,
            to: ProposalStatus::PendingApproval,
            actor: SYSTEM_ACTOR.to_string(),
            at: now,
            note: None,
        }],
        revision: 0,
    }
}
