/// Errors surfaced to callers of the workflow client

use crate::workflow::{StoreError, WorkflowType};

/// Failure of an admission check or a registration
///
/// Every variant names the workflow type involved. None of them are retried by
/// this crate.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    /// A single-instance workflow of this type is already registered
    #[error("a single-instance workflow of type {workflow_type} is already registered")]
    RegistrationConflict { workflow_type: WorkflowType },

    /// A workflow of this type is stored but was not declared single-instance
    #[error(
        "a workflow of type {workflow_type} is registered, but not as a single instance workflow"
    )]
    ConfigurationInconsistency { workflow_type: WorkflowType },

    /// More than one record was found for a type that must be unique
    #[error("{count} workflows of type {workflow_type} are stored where at most one is allowed")]
    StoreInvariantViolation {
        workflow_type: WorkflowType,
        count: usize,
    },

    /// The store failed while serving `operation`
    #[error("store failure during {operation} for workflow type {workflow_type}")]
    Store {
        operation: &'static str,
        workflow_type: WorkflowType,
        #[source]
        source: StoreError,
    },

    /// A typed workflow definition could not be turned into a record
    #[error("state of workflow type {workflow_type} could not be serialized")]
    InvalidState {
        workflow_type: WorkflowType,
        #[source]
        source: serde_json::Error,
    },
}

impl AdmissionError {
    pub(crate) fn store(
        operation: &'static str,
        workflow_type: &WorkflowType,
        source: StoreError,
    ) -> Self {
        Self::Store {
            operation,
            workflow_type: workflow_type.clone(),
            source,
        }
    }

    /// Whether this is a registration conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::RegistrationConflict { .. })
    }

    /// Type identity the failure refers to
    pub fn workflow_type(&self) -> &WorkflowType {
        match self {
            Self::RegistrationConflict { workflow_type }
            | Self::ConfigurationInconsistency { workflow_type }
            | Self::StoreInvariantViolation { workflow_type, .. }
            | Self::Store { workflow_type, .. }
            | Self::InvalidState { workflow_type, .. } => workflow_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn messages_name_the_type() {
        let err = AdmissionError::ConfigurationInconsistency {
            workflow_type: WorkflowType::new("reporting"),
        };
        assert_eq!(
            err.to_string(),
            "a workflow of type reporting is registered, but not as a single instance workflow"
        );
        assert!(!err.is_conflict());
    }

    #[test]
    fn store_failure_keeps_source_and_operation() {
        let err = AdmissionError::store(
            "register_workflow",
            &WorkflowType::new("invoicing"),
            StoreError::Database("database is locked".to_string()),
        );

        assert!(err.to_string().contains("register_workflow"));
        assert_eq!(err.workflow_type().as_str(), "invoicing");
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "database error: database is locked");
    }
}
