/// WorkflowStore trait definition

use async_trait::async_trait;
use uuid::Uuid;

use crate::workflow::types::{Workflow, WorkflowType};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record with this id is already stored
    #[error("workflow already stored: {0}")]
    DuplicateId(Uuid),

    /// The backend's uniqueness guard rejected a second single-instance record
    #[error("a single-instance workflow of type {workflow_type} is already stored")]
    SingleInstanceConflict { workflow_type: WorkflowType },

    /// Database error (connectivity, timeouts, busy database)
    #[error("database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result of an atomic conditional insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalInsert {
    /// No workflow of the type was stored; the new record is now persisted
    Inserted,

    /// At least one workflow of the type was already stored; nothing was written
    Conflict { existing: usize },
}

/// Persistent collection of registered workflows
///
/// Implementations must be safe to share between concurrent callers. The
/// conditional insert is the only operation that reads and writes as one unit;
/// callers enforcing single-instance admission must go through it.
#[async_trait]
pub trait WorkflowStore: Send + Sync + 'static {
    /// All stored workflows of the given type, in no particular order
    async fn get_all_by_type(&self, workflow_type: &WorkflowType)
        -> Result<Vec<Workflow>, StoreError>;

    /// Insert a workflow unconditionally
    async fn insert(&self, workflow: &Workflow) -> Result<(), StoreError>;

    /// Insert a workflow only if no workflow of the same type is stored
    ///
    /// The existence check and the write happen atomically with respect to every
    /// other writer of the same type. Type presence is checked first: a workflow
    /// whose type is already stored yields `Conflict` even if its id is stored too.
    /// `DuplicateId` is only returned when the type is absent.
    async fn insert_if_type_absent(&self, workflow: &Workflow)
        -> Result<ConditionalInsert, StoreError>;

    /// Look up a single workflow by id
    async fn get(&self, id: Uuid) -> Result<Option<Workflow>, StoreError>;

    /// Remove a workflow; returns whether a record was deleted
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Number of stored workflows of the given type
    async fn count_by_type(&self, workflow_type: &WorkflowType) -> Result<usize, StoreError> {
        Ok(self.get_all_by_type(workflow_type).await?.len())
    }
}
