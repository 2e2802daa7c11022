//! # offload-reconcile
//!
//! Keeps one remote function in line with a [`DesiredFunctionSpec`].
//!
//! - [`provider`]: the [`FunctionProvider`] seam and its tagged errors
//! - [`lambda`]: Lambda REST adapter, signed by [`sigv4`]
//! - [`plan`]: observation and diffing
//! - [`converge`]: blocking wait for active + last-update-successful
//! - [`reconciler`]: [`FunctionReconciler::resolve`]
//! - [`ledger`]: per-function in-flight counts
//!
//! [`DesiredFunctionSpec`]: offload_core::DesiredFunctionSpec

pub mod converge;
mod error;
pub mod lambda;
pub mod ledger;
pub mod plan;
pub mod provider;
pub mod reconciler;
pub mod sigv4;

pub use converge::{await_converged, ConvergenceCondition, ConvergencePolicy};
pub use error::ReconcileError;
pub use lambda::LambdaProvider;
pub use ledger::{InFlightGuard, InFlightLedger};
pub use plan::{Observation, PlanReport};
pub use provider::{
    CodeLocation, CreateFunctionRequest, FunctionProvider, ProviderError, RuntimeSettings,
};
pub use reconciler::FunctionReconciler;
