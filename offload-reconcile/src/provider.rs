//! Function-service adapter seam.
//!
//! Adapters classify every failure into a [`ProviderError`] kind. The
//! reconciler branches on those kinds only; raw status codes and message text
//! never leave the adapter.

use thiserror::Error;

use offload_core::{FunctionConfiguration, FunctionName, RemoteFunctionState};
use offload_store::StorageLocation;

/// Classified function-service failure.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The service answered and the function does not exist.
    #[error("function not found")]
    NotFound,

    /// No function service is reachable at this endpoint. Recognized by status
    /// code only, so a same-coded permission error is indistinguishable.
    #[error("function service offline (HTTP {status})")]
    Offline { status: u16 },

    #[error("HTTP {status}{}: {message}", .code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::NotFound => Some(404),
            ProviderError::Offline { status } | ProviderError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The provider's error code, when it sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ProviderError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Where the function's code comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeLocation {
    Image { uri: String },
    Archive(StorageLocation),
}

/// Runtime settings archive-based functions need at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub runtime: String,
    pub handler: String,
}

/// Everything a create call carries: configuration and code in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFunctionRequest {
    pub name: FunctionName,
    pub configuration: FunctionConfiguration,
    pub code: CodeLocation,
    /// `None` for container images.
    pub runtime: Option<RuntimeSettings>,
}

/// Remote function operations consumed by [`crate::FunctionReconciler`].
pub trait FunctionProvider {
    /// Current state; [`ProviderError::NotFound`] when the function is absent.
    fn get_function(&self, name: &FunctionName) -> Result<RemoteFunctionState, ProviderError>;

    fn create_function(&self, request: &CreateFunctionRequest) -> Result<(), ProviderError>;

    fn update_configuration(
        &self,
        name: &FunctionName,
        configuration: &FunctionConfiguration,
    ) -> Result<(), ProviderError>;

    fn update_code(&self, name: &FunctionName, code: &CodeLocation) -> Result<(), ProviderError>;
}

impl<P: FunctionProvider + ?Sized> FunctionProvider for &P {
    fn get_function(&self, name: &FunctionName) -> Result<RemoteFunctionState, ProviderError> {
        (**self).get_function(name)
    }

    fn create_function(&self, request: &CreateFunctionRequest) -> Result<(), ProviderError> {
        (**self).create_function(request)
    }

    fn update_configuration(
        &self,
        name: &FunctionName,
        configuration: &FunctionConfiguration,
    ) -> Result<(), ProviderError> {
        (**self).update_configuration(name, configuration)
    }

    fn update_code(&self, name: &FunctionName, code: &CodeLocation) -> Result<(), ProviderError> {
        (**self).update_code(name, code)
    }
}
