use error_common::{codes, Classified, ErrorCategory, ErrorContext, StoreError};
use thiserror::Error;
use uuid::Uuid;
use workload_balancer::{InvalidTransition, ProposalStatus};

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Proposal {0} not found")]
    NotFound(Uuid),

    /// Terminal proposals are immutable
    #[error("Proposal {id} is already resolved as {status:?}")]
    AlreadyResolved { id: Uuid, status: ProposalStatus },

    /// An auditor's load moved since the snapshot; refresh and retry
    #[error("Auditor {auditor_id} changed since proposal {id} was built (version {expected} → {actual})")]
    StaleLoad {
        id: Uuid,
        auditor_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Auditor {auditor_id} cannot take {requested} findings with capacity {capacity}")]
    CapacityExceeded {
        id: Uuid,
        auditor_id: String,
        capacity: u32,
        requested: u32,
    },

    #[error("Invalid pairings for proposal {id}: {reason}")]
    InvalidModification { id: Uuid, reason: String },

    #[error("Proposal {id}: {source}")]
    InvalidTransition {
        id: Uuid,
        #[source]
        source: InvalidTransition,
    },

    #[error("Workflow store error {context}: {source}")]
    Store {
        #[source]
        source: StoreError,
        context: ErrorContext,
    },
}

impl WorkflowError {
    pub(crate) fn store(source: StoreError, proposal_id: Uuid) -> Self {
        Self::Store {
            source,
            context: ErrorContext::new().add_context("proposal", proposal_id.to_string()),
        }
    }

    pub(crate) fn transition(id: Uuid) -> impl FnOnce(InvalidTransition) -> Self {
        move |source| Self::InvalidTransition { id, source }
    }

    pub(crate) fn invalid(id: Uuid, reason: impl Into<String>) -> Self {
        Self::InvalidModification {
            id,
            reason: reason.into(),
        }
    }
}

impl Classified for WorkflowError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::CapacityExceeded { .. } => ErrorCategory::Scheduling,
            Self::Store { .. } => ErrorCategory::Storage,
            Self::NotFound(_)
            | Self::AlreadyResolved { .. }
            | Self::StaleLoad { .. }
            | Self::InvalidModification { .. }
            | Self::InvalidTransition { .. } => ErrorCategory::Workflow,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => codes::workflow::NOT_FOUND,
            Self::AlreadyResolved { .. } => codes::workflow::ALREADY_RESOLVED,
            Self::StaleLoad { .. } => codes::workflow::STALE_LOAD,
            Self::CapacityExceeded { .. } => codes::workflow::CAPACITY_EXCEEDED,
            Self::InvalidModification { .. } => codes::workflow::INVALID_MODIFICATION,
            Self::InvalidTransition { .. } => codes::workflow::INVALID_TRANSITION,
            Self::Store { source, .. } => source.code(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::StaleLoad { .. } => true,
            Self::Store { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
