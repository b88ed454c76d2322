use anyhow::Result;
use claims_normalizer::NormalizeOutcome;
use colored::Colorize;
use error_common::Classified;
use pre_audit_engine::{BatchReport, CandidateDeduction, ReviewPriority};
use serde::Serialize;
use workload_balancer::{AssignmentProposal, ProposalStatus};

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_normalized(name: &str, outcome: &NormalizeOutcome) {
    let batch = &outcome.batch;
    let stats = &batch.statistics;
    println!(
        "{} {} (invoice {}, version {}, {:?})",
        "✔".green(),
        name.bold(),
        batch.invoice_number.cyan(),
        batch.version,
        batch.status
    );
    println!(
        "  persons {}  services {}  billed {}",
        stats.person_count, stats.total_services, stats.total_billed
    );
    let by_kind: Vec<String> = stats
        .count_by_type
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(kind, count)| format!("{kind} {count}"))
        .collect();
    if !by_kind.is_empty() {
        println!("  {}", by_kind.join(", ").dimmed());
    }
    if outcome.stale_removed > 0 {
        println!("  {} stale services removed", outcome.stale_removed);
    }
    if !outcome.skipped.is_empty() {
        println!(
            "  {} {} records skipped",
            "⚠".yellow(),
            outcome.skipped.len()
        );
        for skipped in &outcome.skipped {
            let kind = skipped.kind.map_or_else(String::new, |k| format!(" {k}"));
            let entry = skipped
                .entry_index
                .map_or_else(String::new, |i| format!(" #{}", i + 1));
            println!(
                "    person {}{kind}{entry}: [{}] {}",
                skipped.person_index + 1,
                skipped.code,
                skipped.reason
            );
        }
    }
}

pub fn print_evaluation(report: &BatchReport) {
    print_normalized(&report.name, &report.normalized);
    let summary = &report.evaluation;
    println!(
        "  validated {}  flagged {}  returned {}",
        summary.validated.to_string().green(),
        summary.flagged.to_string().yellow(),
        summary.returned.to_string().red()
    );
    for candidate in &summary.returns {
        println!(
            "  {} return [{}] {}",
            "↩".red(),
            candidate.causal_code,
            candidate.reason
        );
    }
    for deduction in &summary.deductions {
        print_deduction(deduction);
    }
}

fn print_deduction(deduction: &CandidateDeduction) {
    let priority = format!("{:?}", deduction.priority);
    let priority = match deduction.priority {
        ReviewPriority::Critical => priority.red().bold(),
        ReviewPriority::High => priority.red(),
        ReviewPriority::Medium => priority.yellow(),
        ReviewPriority::Low => priority.normal(),
    };
    println!(
        "  {} {} [{}] {} {} → {} ({})",
        "✂".yellow(),
        deduction.category,
        deduction.causal_code,
        deduction.service_id,
        deduction.billed_amount,
        deduction.suggested_amount,
        priority
    );
}

pub fn print_failure<E: Classified>(name: &str, error: &E) {
    eprintln!(
        "{} {} [{}] {}",
        "✘".red(),
        name.bold(),
        error.code(),
        error
    );
}

pub fn print_proposal(proposal: &AssignmentProposal) {
    let status = format!("{:?}", proposal.status);
    let status = match proposal.status {
        ProposalStatus::Executed => status.green(),
        ProposalStatus::Rejected | ProposalStatus::Expired => status.red(),
        _ => status.yellow(),
    };
    println!("{} proposal {} {}", "▶".cyan(), proposal.id, status);
    println!(
        "  findings {}  assigned {}  unassigned {}  balance {:.3}  deadline {}",
        proposal.findings.len(),
        proposal.assignments.len(),
        proposal.unassigned.len(),
        proposal.balance_score,
        proposal.deadline.to_rfc3339()
    );
    if proposal.no_capacity {
        println!("  {} no auditor capacity for any pending finding", "⚠".yellow());
    }
    for (auditor, count) in &proposal.auditor_counts {
        println!("    {auditor}: {count}");
    }
    for unassigned in &proposal.unassigned {
        println!(
            "    {} {} ({:?})",
            "·".dimmed(),
            unassigned.finding_id,
            unassigned.reason
        );
    }
    for entry in proposal.decision_log.iter().skip(1) {
        println!(
            "  {} → {:?} by {}{}",
            entry.at.to_rfc3339(),
            entry.to,
            entry.actor,
            entry
                .note
                .as_deref()
                .map_or_else(String::new, |n| format!(": {n}"))
        );
    }
}
