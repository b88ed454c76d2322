use chrono::Utc;
use claims_normalizer::{BatchStatus, ClaimBatch, ClaimStore, ValidationStatus};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::RuleEngine;
use crate::error::{RuleError, RuleResult};
use crate::models::{CandidateDeduction, CandidateReturn};
use crate::store::{FindingStore, ReplaceSummary};

/// Outcome of evaluating one batch
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    pub invoice_number: String,
    pub batch_version: u32,
    pub returns: Vec<CandidateReturn>,
    pub deductions: Vec<CandidateDeduction>,
    pub store: ReplaceSummary,
    pub validated: usize,
    pub flagged: usize,
    pub returned: usize,
}

/// Drives a normalized batch through evaluation and persists the results
#[derive(Clone)]
pub struct PreAuditService {
    claims: Arc<dyn ClaimStore>,
    findings: Arc<dyn FindingStore>,
    engine: RuleEngine,
}

impl PreAuditService {
    pub fn new(
        claims: Arc<dyn ClaimStore>,
        findings: Arc<dyn FindingStore>,
        engine: RuleEngine,
    ) -> Self {
        Self {
            claims,
            findings,
            engine,
        }
    }

    /// Evaluate a batch: `PARSED|VALIDATED → VALIDATING → VALIDATED`.
    ///
    /// Findings replace the batch's previous findings; deductions whose id
    /// survives keep their assignment.
    ///
    /// # Errors
    ///
    /// Unknown batch, a status that does not allow validation, or store and
    /// lookup failures. After a failure past `VALIDATING` the batch is marked
    /// `ERROR`.
    pub async fn evaluate_batch(&self, invoice_number: &str) -> RuleResult<EvaluationSummary> {
        let mut batch = self
            .claims
            .get_batch(invoice_number)
            .await
            .map_err(|e| RuleError::store(e, invoice_number))?
            .ok_or_else(|| RuleError::BatchNotFound(invoice_number.to_string()))?;

        self.transition(&mut batch, BatchStatus::Validating).await?;

        match self.evaluate_and_persist(&batch).await {
            Ok(summary) => {
                self.transition(&mut batch, BatchStatus::Validated).await?;
                info!(
                    invoice = %invoice_number,
                    version = batch.version,
                    returns = summary.returns.len(),
                    deductions = summary.deductions.len(),
                    carried_over = summary.store.carried_over,
                    flagged = summary.flagged,
                    "Batch evaluated"
                );
                Ok(summary)
            }
            Err(error) => {
                if let Err(mark_error) = self.transition(&mut batch, BatchStatus::Error).await {
                    warn!(invoice = %invoice_number, error = %mark_error, "Could not mark batch as failed");
                }
                Err(error)
            }
        }
    }

    /// Remove a batch, its services and its findings.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn purge_batch(&self, invoice_number: &str) -> RuleResult<bool> {
        let findings = self
            .findings
            .purge_batch(invoice_number)
            .await
            .map_err(|e| RuleError::store(e, invoice_number))?;
        let batch = self
            .claims
            .purge_batch(invoice_number)
            .await
            .map_err(|e| RuleError::store(e, invoice_number))?;
        info!(invoice = %invoice_number, findings, "Batch and findings purged");
        Ok(batch || findings > 0)
    }

    pub fn findings(&self) -> &Arc<dyn FindingStore> {
        &self.findings
    }

    async fn evaluate_and_persist(&self, batch: &ClaimBatch) -> RuleResult<EvaluationSummary> {
        let invoice = batch.invoice_number.as_str();
        let services = self
            .claims
            .services_for_batch(invoice)
            .await
            .map_err(|e| RuleError::store(e, invoice))?;

        let evaluation = self.engine.evaluate(batch, &services).await?;

        let count = |wanted: ValidationStatus| {
            evaluation
                .statuses
                .iter()
                .filter(|(_, status)| *status == wanted)
                .count()
        };
        let (validated, flagged, returned) = (
            count(ValidationStatus::Validated),
            count(ValidationStatus::Flagged),
            count(ValidationStatus::Returned),
        );

        self.claims
            .update_validation_statuses(invoice, &evaluation.statuses)
            .await
            .map_err(|e| RuleError::store(e, invoice))?;
        let store = self
            .findings
            .replace_batch_findings(invoice, evaluation.returns, evaluation.deductions)
            .await
            .map_err(|e| RuleError::store(e, invoice))?;

        // Read back so carried-over assignments are reported as stored
        let returns = self
            .findings
            .returns_for_batch(invoice)
            .await
            .map_err(|e| RuleError::store(e, invoice))?;
        let deductions = self
            .findings
            .deductions_for_batch(invoice)
            .await
            .map_err(|e| RuleError::store(e, invoice))?;

        Ok(EvaluationSummary {
            invoice_number: invoice.to_string(),
            batch_version: batch.version,
            returns,
            deductions,
            store,
            validated,
            flagged,
            returned,
        })
    }

    async fn transition(&self, batch: &mut ClaimBatch, next: BatchStatus) -> RuleResult<()> {
        if !batch.status.can_transition_to(next) {
            return Err(RuleError::InvalidTransition {
                invoice: batch.invoice_number.clone(),
                from: batch.status,
                to: next,
            });
        }
        batch.status = next;
        batch.updated_at = Utc::now();
        self.claims
            .upsert_batch(batch)
            .await
            .map_err(|e| RuleError::store(e, &batch.invoice_number))
    }
}
