//! Observation and plan computation.

use serde::Serialize;

use offload_core::naming::is_floating_tag;
use offload_core::{FunctionConfiguration, FunctionName, ReconciliationPlan, RemoteFunctionState};

use crate::error::{provider_err, ReconcileError};
use crate::provider::{FunctionProvider, ProviderError};

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// What a fresh fetch of the remote function found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Absent,
    /// No function service is reachable; nothing can or should be done.
    Offline,
    Present(RemoteFunctionState),
}

impl Observation {
    pub fn label(&self) -> String {
        match self {
            Observation::Absent => "absent".to_string(),
            Observation::Offline => "offline".to_string(),
            Observation::Present(state) => state.status().to_string(),
        }
    }
}

/// Fetch `name`, absorbing not-found and offline into [`Observation`].
pub fn observe<P: FunctionProvider>(
    provider: &P,
    name: &FunctionName,
) -> Result<Observation, ReconcileError> {
    match provider.get_function(name) {
        Ok(state) => Ok(Observation::Present(state)),
        Err(ProviderError::NotFound) => Ok(Observation::Absent),
        Err(ProviderError::Offline { status }) => {
            tracing::warn!(%name, status, "function service offline; skipping reconciliation");
            Ok(Observation::Offline)
        }
        Err(e) => Err(provider_err("get-function", name, e)),
    }
}

// ---------------------------------------------------------------------------
// Diffing
// ---------------------------------------------------------------------------

/// Any of memory, role or ephemeral storage differs.
pub fn configuration_differs(remote: &FunctionConfiguration, desired: &FunctionConfiguration) -> bool {
    remote.memory_mb != desired.memory_mb
        || remote.role_arn != desired.role_arn
        || remote.ephemeral_storage_mb != desired.ephemeral_storage_mb
}

/// Image code is stale when the URI changed or the desired tag floats.
pub fn image_is_stale(remote_uri: Option<&str>, desired_uri: &str) -> bool {
    remote_uri != Some(desired_uri) || is_floating_tag(desired_uri)
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Read-only result of [`crate::FunctionReconciler::plan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanReport {
    pub name: FunctionName,
    /// `absent`, `offline`, or the remote status.
    pub remote: String,
    /// `None` when offline: nothing would be done.
    pub plan: Option<ReconciliationPlan>,
}
