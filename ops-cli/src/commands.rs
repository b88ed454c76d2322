use anyhow::{bail, Result};
use chrono::Utc;
use config_engine::AuditCareConfig;
use pre_audit_engine::BatchReport;
use serde::Serialize;
use tracing::info;
use workflow_engine::Decision;
use workload_balancer::AssignmentProposal;

use crate::cli::{Command, DecisionArg, EvaluateArgs, NormalizeArgs, RunArgs};
use crate::context::{read_documents, Engine, ReferenceData};
use crate::report;

pub async fn execute(command: Command, config: AuditCareConfig) -> Result<()> {
    match command {
        Command::Normalize(args) => normalize(args, config).await,
        Command::Evaluate(args) => {
            let engine = evaluation_engine(&args, config)?;
            let (reports, failed) = evaluate(&engine, &args).await?;
            if args.json {
                report::print_json(&reports)?;
            }
            finish(args.claims.len(), failed)
        }
        Command::Run(args) => run(args, config).await,
    }
}

async fn normalize(args: NormalizeArgs, config: AuditCareConfig) -> Result<()> {
    let engine = Engine::new(config, ReferenceData::empty(), 1);
    let documents = read_documents(&args.claims)?;

    let mut outcomes = Vec::with_capacity(documents.len());
    let mut failed = 0;
    for document in &documents {
        match engine
            .normalizer
            .normalize_bytes(&document.bytes, Some(&document.name))
            .await
        {
            Ok(outcome) => {
                if !args.json {
                    report::print_normalized(&document.name, &outcome);
                }
                outcomes.push(outcome);
            }
            Err(error) => {
                failed += 1;
                report::print_failure(&document.name, &error);
            }
        }
    }
    if args.json {
        report::print_json(&outcomes)?;
    }
    finish(documents.len(), failed)
}

fn evaluation_engine(args: &EvaluateArgs, config: AuditCareConfig) -> Result<Engine> {
    let reference = ReferenceData::load(&args.reference, &config)?;
    Ok(Engine::new(config, reference, args.workers))
}

/// Evaluated batches and the number of documents that failed
async fn evaluate(engine: &Engine, args: &EvaluateArgs) -> Result<(Vec<BatchReport>, usize)> {
    let documents = read_documents(&args.claims)?;
    let names: Vec<String> = documents.iter().map(|d| d.name.clone()).collect();
    let results = engine.pipeline.process_all(documents).await;

    let mut reports = Vec::with_capacity(results.len());
    let mut failed = 0;
    for (name, result) in names.iter().zip(results) {
        match result {
            Ok(batch) => {
                if !args.json {
                    report::print_evaluation(&batch);
                }
                reports.push(batch);
            }
            Err(error) => {
                failed += 1;
                report::print_failure(name, &error);
            }
        }
    }
    Ok((reports, failed))
}

#[derive(Serialize)]
struct RunOutput<'a> {
    batches: &'a [BatchReport],
    proposal: &'a AssignmentProposal,
}

async fn run(args: RunArgs, config: AuditCareConfig) -> Result<()> {
    let engine = evaluation_engine(&args.evaluate, config)?;
    let (scheduler, workflow) = engine.assignment(&args.roster)?;
    let (reports, failed) = evaluate(&engine, &args.evaluate).await?;

    let mut proposal = scheduler.generate(Utc::now()).await?;
    if let Some(choice) = args.decision {
        let decision = match choice {
            DecisionArg::Approve => Decision::Approve,
            DecisionArg::Reject => Decision::Reject {
                reason: args
                    .reason
                    .clone()
                    .unwrap_or_else(|| "rejected by operator".to_string()),
            },
        };
        proposal = workflow.decide(proposal.id, decision, &args.supervisor).await?;
        info!(proposal = %proposal.id, status = ?proposal.status, "Decision applied");
    }

    if args.evaluate.json {
        report::print_json(&RunOutput {
            batches: &reports,
            proposal: &proposal,
        })?;
    } else {
        report::print_proposal(&proposal);
    }
    finish(args.evaluate.claims.len(), failed)
}

/// Fails the command when any document failed, after everything was reported
fn finish(total: usize, failed: usize) -> Result<()> {
    if failed > 0 {
        bail!("{failed} of {total} claim documents failed");
    }
    Ok(())
}
