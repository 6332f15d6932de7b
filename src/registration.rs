/// Single-instance registration policy
///
/// Decides whether a workflow may be admitted into a store and performs the
/// admission. Single-instance workflows go through the store's atomic conditional
/// insert; everything else is inserted unconditionally.

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::error::AdmissionError;
use crate::workflow::{ConditionalInsert, Workflow, WorkflowStore};

/// Admits workflows into a store
#[async_trait]
pub trait RegistrationService: Send + Sync + 'static {
    /// Persist `workflow` in `store`, or fail with
    /// [`AdmissionError::RegistrationConflict`] if it is single-instance and its
    /// type is already present.
    async fn register_workflow(
        &self,
        store: &dyn WorkflowStore,
        workflow: Workflow,
    ) -> Result<(), AdmissionError>;
}

/// Default registration policy
///
/// Stateless; one instance can serve any number of stores and callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleInstanceRegistration;

impl SingleInstanceRegistration {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RegistrationService for SingleInstanceRegistration {
    #[instrument(
        skip(self, store, workflow),
        fields(id = %workflow.id, workflow_type = %workflow.workflow_type)
    )]
    async fn register_workflow(
        &self,
        store: &dyn WorkflowStore,
        workflow: Workflow,
    ) -> Result<(), AdmissionError> {
        debug!(
            single_instance = workflow.is_single_instance,
            "registration requested"
        );

        if !workflow.is_single_instance {
            store
                .insert(&workflow)
                .await
                .map_err(|e| AdmissionError::store("insert", &workflow.workflow_type, e))?;
            info!("workflow admitted");
            return Ok(());
        }

        debug!("checking for an existing instance");
        let outcome = store
            .insert_if_type_absent(&workflow)
            .await
            .map_err(|e| {
                AdmissionError::store("insert_if_type_absent", &workflow.workflow_type, e)
            })?;

        match outcome {
            ConditionalInsert::Inserted => {
                info!("single-instance workflow admitted");
                Ok(())
            }
            ConditionalInsert::Conflict { existing } => {
                warn!(existing, "registration rejected, type already registered");
                Err(AdmissionError::RegistrationConflict {
                    workflow_type: workflow.workflow_type,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{InMemoryWorkflowStore, StoreError, WorkflowType};
    use async_trait::async_trait;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_plain_workflows_always_insert() {
        let store = InMemoryWorkflowStore::new();
        let service = SingleInstanceRegistration::new();

        for _ in 0..3 {
            service
                .register_workflow(&store, Workflow::new("reporting", false, json!({})))
                .await
                .unwrap();
        }
        assert_eq!(store.workflow_count(), 3);
    }

    #[tokio::test]
    async fn test_second_single_instance_is_rejected() {
        let store = InMemoryWorkflowStore::new();
        let service = SingleInstanceRegistration::new();

        service
            .register_workflow(&store, Workflow::new("invoicing", true, json!({})))
            .await
            .unwrap();
        let err = service
            .register_workflow(&store, Workflow::new("invoicing", true, json!({})))
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(store.workflow_count(), 1);
    }

    #[tokio::test]
    async fn test_single_instance_rejected_when_plain_record_of_type_exists() {
        let store = InMemoryWorkflowStore::new();
        let service = SingleInstanceRegistration::new();

        service
            .register_workflow(&store, Workflow::new("reporting", false, json!({})))
            .await
            .unwrap();
        let err = service
            .register_workflow(&store, Workflow::new("reporting", true, json!({})))
            .await
            .unwrap_err();

        assert!(err.is_conflict());
    }

    /// Store whose every call fails, as a dropped connection would
    struct UnreachableStore;

    #[async_trait]
    impl WorkflowStore for UnreachableStore {
        async fn get_all_by_type(&self, _: &WorkflowType) -> Result<Vec<Workflow>, StoreError> {
            Err(StoreError::Database("connection refused".into()))
        }

        async fn insert(&self, _: &Workflow) -> Result<(), StoreError> {
            Err(StoreError::Database("connection refused".into()))
        }

        async fn insert_if_type_absent(
            &self,
            _: &Workflow,
        ) -> Result<ConditionalInsert, StoreError> {
            Err(StoreError::Database("connection refused".into()))
        }

        async fn get(&self, _: Uuid) -> Result<Option<Workflow>, StoreError> {
            Err(StoreError::Database("connection refused".into()))
        }

        async fn delete(&self, _: Uuid) -> Result<bool, StoreError> {
            Err(StoreError::Database("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_propagates_with_operation() {
        let service = SingleInstanceRegistration::new();

        let err = service
            .register_workflow(&UnreachableStore, Workflow::new("invoicing", true, json!({})))
            .await
            .unwrap_err();

        match err {
            AdmissionError::Store {
                operation,
                workflow_type,
                source: StoreError::Database(msg),
            } => {
                assert_eq!(operation, "insert_if_type_absent");
                assert_eq!(workflow_type.as_str(), "invoicing");
                assert_eq!(msg, "connection refused");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
