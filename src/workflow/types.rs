/// Core workflow type definitions
///
/// Defines the persisted workflow record and the typed definition trait used by callers
/// to declare a workflow kind. Business state is carried as opaque JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Type identity of a workflow kind
///
/// This is the uniqueness scope for single-instance workflows: two records with the
/// same `WorkflowType` are instances of the same kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowType(String);

impl WorkflowType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Type identity declared by a typed workflow definition
    pub fn of<D: WorkflowDefinition>() -> Self {
        Self(D::TYPE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkflowType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for WorkflowType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A typed workflow kind
///
/// Implementors declare their type identity and whether at most one instance of the
/// kind may exist at a time. The implementor's fields become the record's state.
///
/// ```
/// use serde::Serialize;
/// use workgate::WorkflowDefinition;
///
/// #[derive(Serialize)]
/// struct Invoicing {
///     batch: u32,
/// }
///
/// impl WorkflowDefinition for Invoicing {
///     const TYPE: &'static str = "invoicing";
///     const SINGLE_INSTANCE: bool = true;
/// }
/// ```
pub trait WorkflowDefinition: Serialize {
    /// Type identity shared by every instance of this kind
    const TYPE: &'static str;

    /// Whether at most one instance of this kind may be registered at a time
    const SINGLE_INSTANCE: bool = false;
}

/// A registered (or about to be registered) workflow instance
///
/// Constructed by a caller, handed to the registration service, and owned by the
/// store once admitted. Nothing in this crate changes `state` after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique instance identifier, assigned on creation
    pub id: Uuid,
    /// Kind of workflow this instance belongs to
    pub workflow_type: WorkflowType,
    /// Fixed at definition time
    pub is_single_instance: bool,
    /// Workflow-specific business state
    pub state: Value,
    pub created_at: DateTime<Utc>,
}

impl Workflow {
    /// Create a new instance with a fresh identifier
    pub fn new(workflow_type: impl Into<WorkflowType>, is_single_instance: bool, state: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_type: workflow_type.into(),
            is_single_instance,
            state,
            created_at: Utc::now(),
        }
    }

    /// Build an instance from a typed definition, serializing it as the state
    pub fn from_definition<D: WorkflowDefinition>(definition: &D) -> Result<Self, serde_json::Error> {
        let state = serde_json::to_value(definition)?;
        Ok(Self::new(WorkflowType::of::<D>(), D::SINGLE_INSTANCE, state))
    }
}
