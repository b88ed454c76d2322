use claims_normalizer::{NormalizeOutcome, Normalizer};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::error::{RuleError, RuleResult};
use crate::service::{EvaluationSummary, PreAuditService};

/// One claim document waiting for processing
#[derive(Debug, Clone)]
pub struct ClaimDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Normalization and evaluation results of one document
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub name: String,
    pub normalized: NormalizeOutcome,
    pub evaluation: EvaluationSummary,
}

/// Normalize-then-evaluate over independent claim batches.
///
/// Batches share no mutable state, so up to `workers` of them run at once.
#[derive(Clone)]
pub struct PreAuditPipeline {
    normalizer: Normalizer,
    service: PreAuditService,
    workers: usize,
}

impl PreAuditPipeline {
    pub fn new(normalizer: Normalizer, service: PreAuditService, workers: usize) -> Self {
        Self {
            normalizer,
            service,
            workers: workers.max(1),
        }
    }

    /// # Errors
    ///
    /// Any normalization or evaluation failure of this document.
    pub async fn process(&self, document: &ClaimDocument) -> RuleResult<BatchReport> {
        let normalized = self
            .normalizer
            .normalize_bytes(&document.bytes, Some(&document.name))
            .await?;
        let evaluation = self
            .service
            .evaluate_batch(&normalized.batch.invoice_number)
            .await?;
        Ok(BatchReport {
            name: document.name.clone(),
            normalized,
            evaluation,
        })
    }

    /// Process every document; results come back in input order and one
    /// failing batch never stops the others.
    pub async fn process_all(&self, documents: Vec<ClaimDocument>) -> Vec<RuleResult<BatchReport>> {
        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        let total = documents.len();

        for (index, document) in documents.into_iter().enumerate() {
            let pipeline = self.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (index, pipeline.process(&document).await)
            });
        }

        let mut results: Vec<Option<RuleResult<BatchReport>>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Some(slot) = results.get_mut(index) {
                        *slot = Some(result);
                    }
                }
                Err(join_error) => error!(error = %join_error, "Batch worker aborted"),
            }
        }

        let results: Vec<RuleResult<BatchReport>> = results
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(RuleError::Worker("worker aborted".to_string()))))
            .collect();
        info!(
            documents = total,
            failed = results.iter().filter(|r| r.is_err()).count(),
            "Claim documents processed"
        );
        results
    }
}
