/// workgate: single-instance admission control for workflow engines
///
/// Decides whether a workflow instance may enter a shared execution engine and admits it.
/// Workflow kinds declared single-instance can never have two registered instances,
/// even when many callers register concurrently against the same store.

// Store configuration
pub mod config;

// Workflow records and store backends
pub mod workflow;

// Admission policy - atomic check-and-insert for single-instance workflows
pub mod registration;

// Caller-facing facade
pub mod client;

// Caller-facing error taxonomy
pub mod error;

// Re-export commonly used types for external consumers
pub use client::WorkflowClient;
pub use config::{Config, StoreConfig};
pub use error::AdmissionError;
pub use registration::{RegistrationService, SingleInstanceRegistration};
pub use workflow::{
    ConditionalInsert, InMemoryWorkflowStore, SqliteWorkflowStore, StoreError, Workflow,
    WorkflowDefinition, WorkflowStore, WorkflowType,
};
