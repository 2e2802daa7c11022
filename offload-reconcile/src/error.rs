use thiserror::Error;

use offload_core::{FunctionName, SpecError};
use offload_store::StoreError;

use crate::converge::ConvergenceCondition;
use crate::provider::ProviderError;

/// Error surface for reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A function-service call failed. `source` keeps the classified kind,
    /// status and provider code.
    #[error("{operation} {name} failed: {source}")]
    Provider {
        operation: &'static str,
        name: FunctionName,
        #[source]
        source: ProviderError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Spec(#[from] SpecError),

    /// The provider reported the function (or its last update) as failed
    /// while waiting for convergence.
    #[error("function {name} did not converge ({condition}): {reason}")]
    ConvergenceFailed {
        name: FunctionName,
        condition: ConvergenceCondition,
        reason: String,
    },

    #[error("invalid provider configuration: {0}")]
    Config(String),
}

impl ReconcileError {
    /// The classified provider failure, if this is one.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            ReconcileError::Provider { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub(crate) fn provider_err(
    operation: &'static str,
    name: &FunctionName,
    source: ProviderError,
) -> ReconcileError {
    ReconcileError::Provider {
        operation,
        name: name.clone(),
        source,
    }
}
