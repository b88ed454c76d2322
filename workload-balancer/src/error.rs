use config_engine::ConfigError;
use error_common::{codes, Classified, ErrorCategory, ErrorContext, StoreError};
use thiserror::Error;

use crate::models::ProposalStatus;

/// A proposal status change outside the workflow transition table
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Proposal cannot move from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: ProposalStatus,
    pub to: ProposalStatus,
}

#[derive(Error, Debug)]
pub enum BalancerError {
    #[error("Invalid balancer weights: {0}")]
    InvalidWeights(#[source] ConfigError),

    #[error("Auditor roster unavailable: {0}")]
    RosterUnavailable(#[source] StoreError),

    #[error("Invalid roster document: {0}")]
    InvalidRoster(String),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    #[error("Proposal store error {context}: {source}")]
    Store {
        #[source]
        source: StoreError,
        context: ErrorContext,
    },
}

impl BalancerError {
    pub(crate) fn store(source: StoreError, operation: &str) -> Self {
        Self::Store {
            source,
            context: ErrorContext::new().add_context("operation", operation),
        }
    }
}

impl Classified for BalancerError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidWeights(_) => ErrorCategory::Configuration,
            Self::RosterUnavailable(_) | Self::InvalidRoster(_) => ErrorCategory::Scheduling,
            Self::Transition(_) => ErrorCategory::Workflow,
            Self::Store { .. } => ErrorCategory::Storage,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::InvalidWeights(_) => codes::scheduling::INVALID_WEIGHTS,
            Self::RosterUnavailable(_) | Self::InvalidRoster(_) => {
                codes::scheduling::ROSTER_UNAVAILABLE
            }
            Self::Transition(_) => codes::workflow::INVALID_TRANSITION,
            Self::Store { source, .. } => source.code(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::RosterUnavailable(source) | Self::Store { source, .. } => source.is_retryable(),
            Self::InvalidWeights(_) | Self::InvalidRoster(_) | Self::Transition(_) => false,
        }
    }
}

pub type BalancerResult<T> = Result<T, BalancerError>;
