//! Offload core library: domain types, configuration, errors.
//!
//! - [`types`]: desired/remote function state, plans, content addresses
//! - [`naming`]: deterministic function-name derivation
//! - [`config`]: YAML configuration load / save / template
//! - [`error`]: [`ConfigError`], [`SpecError`]

pub mod config;
pub mod error;
pub mod naming;
pub mod types;

pub use config::OffloadConfig;
pub use error::{ConfigError, SpecError};
pub use types::{
    CodeReference, ContentAddress, DesiredFunctionSpec, FunctionConfiguration, FunctionName,
    FunctionState, FunctionStatus, LastUpdateStatus, ReconciliationPlan, RemoteCode,
    RemoteFunctionState,
};
