/// Caller-facing workflow client
///
/// Answers "is a single-instance workflow of this type registered?" and registers
/// new workflows. The store and the registration policy are injected at
/// construction; the client itself keeps no state between calls.

use std::sync::Arc;

use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::error::AdmissionError;
use crate::registration::{RegistrationService, SingleInstanceRegistration};
use crate::workflow::{Workflow, WorkflowDefinition, WorkflowStore, WorkflowType};

/// Facade over a workflow store and a registration policy
///
/// Cloning is cheap and every clone talks to the same store.
#[derive(Clone)]
pub struct WorkflowClient {
    store: Arc<dyn WorkflowStore>,
    registration: Arc<dyn RegistrationService>,
}

impl WorkflowClient {
    /// Client using the default single-instance registration policy
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self::with_registration(store, Arc::new(SingleInstanceRegistration::new()))
    }

    /// Client with an explicitly supplied registration policy
    pub fn with_registration(
        store: Arc<dyn WorkflowStore>,
        registration: Arc<dyn RegistrationService>,
    ) -> Self {
        Self {
            store,
            registration,
        }
    }

    /// The store this client reads and writes
    pub fn store(&self) -> &Arc<dyn WorkflowStore> {
        &self.store
    }

    /// Check whether a single-instance workflow of `workflow_type` is registered
    ///
    /// Returns `false` when nothing of the type is stored and `true` when exactly one
    /// single-instance record is. A stored record not flagged single-instance is a
    /// [`ConfigurationInconsistency`](AdmissionError::ConfigurationInconsistency);
    /// more than one record is a
    /// [`StoreInvariantViolation`](AdmissionError::StoreInvariantViolation).
    #[instrument(skip(self), fields(workflow_type = %workflow_type))]
    pub async fn is_single_instance_workflow_registered(
        &self,
        workflow_type: &WorkflowType,
    ) -> Result<bool, AdmissionError> {
        let workflows = self
            .store
            .get_all_by_type(workflow_type)
            .await
            .map_err(|e| AdmissionError::store("get_all_by_type", workflow_type, e))?;

        match workflows.as_slice() {
            [] => Ok(false),
            [wf] if wf.is_single_instance => Ok(true),
            [wf] => {
                warn!(id = %wf.id, "workflow type is registered but not as single instance");
                Err(AdmissionError::ConfigurationInconsistency {
                    workflow_type: workflow_type.clone(),
                })
            }
            many => {
                error!(count = many.len(), "more than one record stored for a unique workflow type");
                Err(AdmissionError::StoreInvariantViolation {
                    workflow_type: workflow_type.clone(),
                    count: many.len(),
                })
            }
        }
    }

    /// Typed form of [`is_single_instance_workflow_registered`](Self::is_single_instance_workflow_registered)
    pub async fn is_registered<D: WorkflowDefinition>(&self) -> Result<bool, AdmissionError> {
        self.is_single_instance_workflow_registered(&WorkflowType::of::<D>())
            .await
    }

    /// Register a workflow with the engine
    ///
    /// Single-instance workflows whose type is already registered fail with
    /// [`RegistrationConflict`](AdmissionError::RegistrationConflict).
    pub async fn register_workflow(&self, workflow: Workflow) -> Result<(), AdmissionError> {
        self.registration
            .register_workflow(self.store.as_ref(), workflow)
            .await
    }

    /// Build a workflow from a typed definition and register it, returning its id
    pub async fn register<D: WorkflowDefinition + Sync>(
        &self,
        definition: &D,
    ) -> Result<Uuid, AdmissionError> {
        let workflow =
            Workflow::from_definition(definition).map_err(|source| AdmissionError::InvalidState {
                workflow_type: WorkflowType::of::<D>(),
                source,
            })?;
        let id = workflow.id;
        self.register_workflow(workflow).await?;
        Ok(id)
    }
}

impl std::fmt::Debug for WorkflowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowClient").finish_non_exhaustive()
    }
}
