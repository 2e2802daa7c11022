//! [`FunctionReconciler`]: observe, plan, execute, converge.
//!
//! One call to [`FunctionReconciler::resolve`] runs to completion, including
//! blocking convergence waits, before returning. Concurrent reconciliations of
//! the same function are not coordinated here; see [`crate::InFlightLedger`].

use offload_core::types::PackagedArchive;
use offload_core::{
    CodeReference, DesiredFunctionSpec, FunctionName, ReconciliationPlan, RemoteFunctionState,
};
use offload_store::{ContentStore, ObjectStoreClient, TransferGate};

use crate::converge::{await_converged, ConvergencePolicy};
use crate::error::{provider_err, ReconcileError};
use crate::plan::{configuration_differs, image_is_stale, observe, Observation, PlanReport};
use crate::provider::{CodeLocation, CreateFunctionRequest, FunctionProvider, RuntimeSettings};

pub struct FunctionReconciler<P, C> {
    provider: P,
    store: ContentStore<C>,
    convergence: ConvergencePolicy,
}

impl<P: FunctionProvider, C: ObjectStoreClient> FunctionReconciler<P, C> {
    pub fn new(provider: P, store: ContentStore<C>, convergence: ConvergencePolicy) -> Self {
        Self {
            provider,
            store,
            convergence,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn store(&self) -> &ContentStore<C> {
        &self.store
    }

    /// Bring the remote function in line with `spec` and return its name,
    /// ready for invocation.
    pub fn resolve(&self, spec: DesiredFunctionSpec) -> Result<FunctionName, ReconcileError> {
        let name = spec.name().clone();

        match observe(&self.provider, &name)? {
            Observation::Offline => {}
            Observation::Absent => self.create(&spec)?,
            Observation::Present(remote) => self.update(&spec, &remote)?,
        }
        Ok(name)
    }

    /// Compute what [`resolve`](Self::resolve) would do without uploading or
    /// mutating anything.
    pub fn plan(&self, spec: &DesiredFunctionSpec) -> Result<PlanReport, ReconcileError> {
        let observation = observe(&self.provider, spec.name())?;
        let plan = match &observation {
            Observation::Offline => None,
            Observation::Absent => Some(ReconciliationPlan::create()),
            Observation::Present(remote) => {
                let code = match spec.code() {
                    CodeReference::ContainerImage { uri } => {
                        image_is_stale(remote.code.image_uri.as_deref(), uri)
                    }
                    CodeReference::PackagedArchive(archive) => TransferGate::new(&self.store)
                        .needs_upload(&archive.key, &archive.content_hash)?,
                };
                Some(ReconciliationPlan::update(
                    configuration_differs(&remote.configuration, spec.configuration()),
                    code,
                ))
            }
        };
        Ok(PlanReport {
            name: spec.name().clone(),
            remote: observation.label(),
            plan,
        })
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    fn create(&self, spec: &DesiredFunctionSpec) -> Result<(), ReconcileError> {
        let name = spec.name();
        let (code, runtime) = match spec.code() {
            CodeReference::ContainerImage { uri } => (CodeLocation::Image { uri: uri.clone() }, None),
            CodeReference::PackagedArchive(archive) => {
                self.stage(archive)?;
                (
                    CodeLocation::Archive(self.store.location(&archive.key)),
                    Some(RuntimeSettings {
                        runtime: archive.runtime.clone(),
                        handler: archive.handler.clone(),
                    }),
                )
            }
        };

        let request = CreateFunctionRequest {
            name: name.clone(),
            configuration: spec.configuration().clone(),
            code,
            runtime,
        };
        tracing::info!(%name, "creating function");
        self.provider
            .create_function(&request)
            .map_err(|e| provider_err("create-function", name, e))?;
        await_converged(&self.provider, name, self.convergence)?;
        Ok(())
    }

    fn update(
        &self,
        spec: &DesiredFunctionSpec,
        remote: &RemoteFunctionState,
    ) -> Result<(), ReconcileError> {
        let name = spec.name();
        let needs_config_update = configuration_differs(&remote.configuration, spec.configuration());

        // Archive code is staged while planning: the gate's upload decision
        // is the code-update decision.
        let code_update = match spec.code() {
            CodeReference::ContainerImage { uri } => {
                image_is_stale(remote.code.image_uri.as_deref(), uri)
                    .then(|| CodeLocation::Image { uri: uri.clone() })
            }
            CodeReference::PackagedArchive(archive) => self
                .stage(archive)?
                .then(|| CodeLocation::Archive(self.store.location(&archive.key))),
        };

        let plan = ReconciliationPlan::update(needs_config_update, code_update.is_some());
        if plan.is_noop() {
            tracing::debug!(%name, "function up to date");
            return Ok(());
        }

        if plan.needs_config_update() {
            tracing::info!(%name, "updating function configuration");
            self.provider
                .update_configuration(name, spec.configuration())
                .map_err(|e| provider_err("update-configuration", name, e))?;
            await_converged(&self.provider, name, self.convergence)?;
        }

        if let Some(code) = code_update {
            tracing::info!(%name, "updating function code");
            self.provider
                .update_code(name, &code)
                .map_err(|e| provider_err("update-code", name, e))?;
            await_converged(&self.provider, name, self.convergence)?;
        }
        Ok(())
    }

    /// Gate-upload an archive artifact; `true` when it was uploaded.
    fn stage(&self, archive: &PackagedArchive) -> Result<bool, ReconcileError> {
        let outcome = TransferGate::new(&self.store).upload_file_if_changed(
            &archive.key,
            &archive.content_hash,
            &archive.path,
        )?;
        Ok(outcome.uploaded())
    }
}
