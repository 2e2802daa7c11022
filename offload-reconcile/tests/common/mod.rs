#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use offload_core::{
    FunctionConfiguration, FunctionName, FunctionState, LastUpdateStatus, RemoteCode,
    RemoteFunctionState,
};
use offload_reconcile::{
    CodeLocation, ConvergencePolicy, CreateFunctionRequest, FunctionProvider, FunctionReconciler,
    ProviderError,
};
use offload_store::{ContentStore, MemoryObjectStore};

pub const BUCKET: &str = "artifacts";

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(FunctionName),
    Create(CreateFunctionRequest),
    UpdateConfiguration(FunctionName, FunctionConfiguration),
    UpdateCode(FunctionName, CodeLocation),
}

impl Call {
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Call::Get(_))
    }
}

#[derive(Debug, Default)]
struct Inner {
    function: Option<RemoteFunctionState>,
    offline: bool,
    deny: bool,
    settle_polls: usize,
    pending_polls: usize,
    fail_with: Option<String>,
    calls: Vec<Call>,
}

/// In-process function service that records every call.
///
/// After each mutating call the function reports a transitional status for
/// `settle_polls` fetches, then settles (or fails, when configured to).
#[derive(Debug, Default)]
pub struct FakeProvider {
    inner: Mutex<Inner>,
}

impl FakeProvider {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn with_function(state: RemoteFunctionState) -> Self {
        let provider = Self::default();
        provider.inner.lock().unwrap().function = Some(state);
        provider
    }

    pub fn offline() -> Self {
        let provider = Self::default();
        provider.inner.lock().unwrap().offline = true;
        provider
    }

    pub fn denied() -> Self {
        let provider = Self::default();
        provider.inner.lock().unwrap().deny = true;
        provider
    }

    pub fn settle_after(self, polls: usize) -> Self {
        self.inner.lock().unwrap().settle_polls = polls;
        self
    }

    /// Every mutating call leaves the function in a failed update.
    pub fn failing_updates(self, reason: &str) -> Self {
        self.inner.lock().unwrap().fail_with = Some(reason.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    pub fn function(&self) -> Option<RemoteFunctionState> {
        self.inner.lock().unwrap().function.clone()
    }

    fn mutate(&self, call: Call, apply: impl FnOnce(&mut Option<RemoteFunctionState>)) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        apply(&mut inner.function);
        inner.pending_polls = inner.settle_polls;
        let failure = inner.fail_with.clone();
        if let (Some(reason), Some(function)) = (failure, inner.function.as_mut()) {
            function.last_update = LastUpdateStatus::Failed;
            function.reason = Some(reason);
        }
    }
}

impl FunctionProvider for FakeProvider {
    fn get_function(&self, name: &FunctionName) -> Result<RemoteFunctionState, ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Get(name.clone()));
        if inner.offline {
            return Err(ProviderError::Offline { status: 501 });
        }
        if inner.deny {
            return Err(ProviderError::Api {
                status: 403,
                code: Some("AccessDeniedException".to_string()),
                message: "denied".to_string(),
            });
        }
        let mut state = inner.function.clone().ok_or(ProviderError::NotFound)?;
        if inner.pending_polls > 0 {
            inner.pending_polls -= 1;
            state.state = FunctionState::Pending;
            state.last_update = LastUpdateStatus::InProgress;
        }
        Ok(state)
    }

    fn create_function(&self, request: &CreateFunctionRequest) -> Result<(), ProviderError> {
        let image_uri = match &request.code {
            CodeLocation::Image { uri } => Some(uri.clone()),
            CodeLocation::Archive(_) => None,
        };
        let configuration = request.configuration.clone();
        self.mutate(Call::Create(request.clone()), |function| {
            *function = Some(RemoteFunctionState {
                configuration,
                code: RemoteCode {
                    image_uri,
                    code_sha256: None,
                },
                state: FunctionState::Active,
                last_update: LastUpdateStatus::Successful,
                reason: None,
            });
        });
        Ok(())
    }

    fn update_configuration(
        &self,
        name: &FunctionName,
        configuration: &FunctionConfiguration,
    ) -> Result<(), ProviderError> {
        let updated = configuration.clone();
        self.mutate(
            Call::UpdateConfiguration(name.clone(), configuration.clone()),
            |function| {
                if let Some(f) = function {
                    f.configuration = updated;
                }
            },
        );
        Ok(())
    }

    fn update_code(&self, name: &FunctionName, code: &CodeLocation) -> Result<(), ProviderError> {
        let image_uri = match code {
            CodeLocation::Image { uri } => Some(uri.clone()),
            CodeLocation::Archive(_) => None,
        };
        self.mutate(Call::UpdateCode(name.clone(), code.clone()), |function| {
            if let Some(f) = function {
                f.code.image_uri = image_uri;
            }
        });
        Ok(())
    }
}

pub fn remote(memory_mb: u32, role: &str, storage_mb: u32, image: Option<&str>) -> RemoteFunctionState {
    RemoteFunctionState {
        configuration: FunctionConfiguration {
            memory_mb,
            role_arn: role.to_string(),
            ephemeral_storage_mb: storage_mb,
        },
        code: RemoteCode {
            image_uri: image.map(str::to_string),
            code_sha256: None,
        },
        state: FunctionState::Active,
        last_update: LastUpdateStatus::Successful,
        reason: None,
    }
}

pub fn configuration(memory_mb: u32, role: &str, storage_mb: u32) -> FunctionConfiguration {
    FunctionConfiguration {
        memory_mb,
        role_arn: role.to_string(),
        ephemeral_storage_mb: storage_mb,
    }
}

pub fn reconciler(
    provider: &FakeProvider,
) -> FunctionReconciler<&FakeProvider, MemoryObjectStore> {
    let store = ContentStore::new(MemoryObjectStore::new(), BUCKET, Duration::from_secs(600));
    FunctionReconciler::new(provider, store, ConvergencePolicy::immediate())
}
