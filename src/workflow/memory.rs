/// In-memory workflow store, grouped by type identity

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::store::{ConditionalInsert, StoreError, WorkflowStore};
use super::types::{Workflow, WorkflowType};

/// In-memory implementation of WorkflowStore
///
/// Records are grouped by type identity. Every write, including the conditional
/// insert, runs under a single write guard, so the check-then-insert cannot
/// interleave with another writer.
///
/// # Example
///
/// ```
/// use workgate::InMemoryWorkflowStore;
///
/// let store = InMemoryWorkflowStore::new();
/// assert_eq!(store.workflow_count(), 0);
/// ```
pub struct InMemoryWorkflowStore {
    workflows: RwLock<HashMap<WorkflowType, Vec<Workflow>>>,
}

impl InMemoryWorkflowStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
        }
    }

    /// Get the number of workflows across all types
    pub fn workflow_count(&self) -> usize {
        self.workflows.read().values().map(Vec::len).sum()
    }

    /// Get the number of distinct types with at least one stored workflow
    pub fn type_count(&self) -> usize {
        self.workflows.read().len()
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        self.workflows.write().clear();
    }

    fn contains_id(workflows: &HashMap<WorkflowType, Vec<Workflow>>, id: Uuid) -> bool {
        workflows.values().flatten().any(|w| w.id == id)
    }
}

impl Default for InMemoryWorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn get_all_by_type(
        &self,
        workflow_type: &WorkflowType,
    ) -> Result<Vec<Workflow>, StoreError> {
        let workflows = self.workflows.read();
        Ok(workflows.get(workflow_type).cloned().unwrap_or_default())
    }

    async fn insert(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let mut workflows = self.workflows.write();
        if Self::contains_id(&workflows, workflow.id) {
            return Err(StoreError::DuplicateId(workflow.id));
        }

        // Mirrors the partial unique index of the SQLite backend.
        let single_instance_present = workflows
            .get(&workflow.workflow_type)
            .is_some_and(|bucket| bucket.iter().any(|w| w.is_single_instance));
        if workflow.is_single_instance && single_instance_present {
            return Err(StoreError::SingleInstanceConflict {
                workflow_type: workflow.workflow_type.clone(),
            });
        }

        workflows
            .entry(workflow.workflow_type.clone())
            .or_default()
            .push(workflow.clone());
        Ok(())
    }

    async fn insert_if_type_absent(
        &self,
        workflow: &Workflow,
    ) -> Result<ConditionalInsert, StoreError> {
        let mut workflows = self.workflows.write();

        // Type presence is decided before id uniqueness, as in the SQLite backend.
        if let Some(bucket) = workflows.get(&workflow.workflow_type) {
            return Ok(ConditionalInsert::Conflict {
                existing: bucket.len(),
            });
        }
        if Self::contains_id(&workflows, workflow.id) {
            return Err(StoreError::DuplicateId(workflow.id));
        }

        workflows.insert(workflow.workflow_type.clone(), vec![workflow.clone()]);
        Ok(ConditionalInsert::Inserted)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Workflow>, StoreError> {
        let workflows = self.workflows.read();
        Ok(workflows.values().flatten().find(|w| w.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut workflows = self.workflows.write();
        let Some((workflow_type, pos)) = workflows.iter().find_map(|(ty, bucket)| {
            bucket.iter().position(|w| w.id == id).map(|pos| (ty.clone(), pos))
        }) else {
            return Ok(false);
        };

        if let Some(bucket) = workflows.get_mut(&workflow_type) {
            bucket.remove(pos);
            if bucket.is_empty() {
                workflows.remove(&workflow_type);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_and_get_by_type() {
        let store = InMemoryWorkflowStore::new();
        let a = Workflow::new("reporting", false, json!({"n": 1}));
        let b = Workflow::new("reporting", false, json!({"n": 2}));
        let c = Workflow::new("billing", false, json!({}));

        store.insert(&a).await.unwrap();
        store.insert(&b).await.unwrap();
        store.insert(&c).await.unwrap();

        let reporting = store
            .get_all_by_type(&WorkflowType::new("reporting"))
            .await
            .unwrap();
        assert_eq!(reporting.len(), 2);
        assert_eq!(store.workflow_count(), 3);
        assert_eq!(
            store.count_by_type(&WorkflowType::new("billing")).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_unknown_type_is_empty() {
        let store = InMemoryWorkflowStore::new();
        let found = store
            .get_all_by_type(&WorkflowType::new("missing"))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_conditional_insert_conflicts_on_existing_type() {
        let store = InMemoryWorkflowStore::new();
        let first = Workflow::new("invoicing", true, json!({}));
        let second = Workflow::new("invoicing", true, json!({}));

        assert_eq!(
            store.insert_if_type_absent(&first).await.unwrap(),
            ConditionalInsert::Inserted
        );
        assert_eq!(
            store.insert_if_type_absent(&second).await.unwrap(),
            ConditionalInsert::Conflict { existing: 1 }
        );
        assert!(store.get(second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = InMemoryWorkflowStore::new();
        let wf = Workflow::new("reporting", false, json!({}));

        store.insert(&wf).await.unwrap();
        let err = store.insert(&wf).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(id) if id == wf.id));
    }

    #[tokio::test]
    async fn test_insert_rejects_second_single_instance() {
        let store = InMemoryWorkflowStore::new();
        store
            .insert(&Workflow::new("invoicing", true, json!({})))
            .await
            .unwrap();

        let err = store
            .insert(&Workflow::new("invoicing", true, json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SingleInstanceConflict { .. }));
        assert_eq!(store.workflow_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_frees_type() {
        let store = InMemoryWorkflowStore::new();
        let wf = Workflow::new("invoicing", true, json!({}));
        store.insert_if_type_absent(&wf).await.unwrap();

        assert!(store.delete(wf.id).await.unwrap());
        assert!(!store.delete(wf.id).await.unwrap());

        let next = Workflow::new("invoicing", true, json!({}));
        assert_eq!(
            store.insert_if_type_absent(&next).await.unwrap(),
            ConditionalInsert::Inserted
        );
    }

    #[tokio::test]
    async fn test_clear() {
        let store = InMemoryWorkflowStore::new();
        store
            .insert(&Workflow::new("reporting", false, json!({})))
            .await
            .unwrap();
        store.clear();
        assert_eq!(store.workflow_count(), 0);
    }

    #[tokio::test]
    async fn test_type_presence_wins_over_duplicate_id() {
        let store = InMemoryWorkflowStore::new();
        let wf = Workflow::new("invoicing", true, json!({}));
        store.insert_if_type_absent(&wf).await.unwrap();

        assert_eq!(
            store.insert_if_type_absent(&wf).await.unwrap(),
            ConditionalInsert::Conflict { existing: 1 }
        );
    }

    #[tokio::test]
    async fn test_duplicate_id_under_another_type() {
        let store = InMemoryWorkflowStore::new();
        let wf = Workflow::new("invoicing", true, json!({}));
        store.insert(&wf).await.unwrap();

        let mut moved = wf.clone();
        moved.workflow_type = WorkflowType::new("settlement");
        let err = store.insert_if_type_absent(&moved).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(id) if id == wf.id));
    }

    #[tokio::test]
    async fn test_no_bucket_left_behind() {
        let store = InMemoryWorkflowStore::new();
        let first = Workflow::new("invoicing", true, json!({}));
        store.insert_if_type_absent(&first).await.unwrap();
        store
            .insert_if_type_absent(&Workflow::new("invoicing", true, json!({})))
            .await
            .unwrap();
        store.get_all_by_type(&WorkflowType::new("never-seen")).await.unwrap();

        assert_eq!(store.type_count(), 1);
        store.delete(first.id).await.unwrap();
        assert_eq!(store.type_count(), 0);
    }
}
