/// Workflow Management Layer
///
/// This module handles workflow records and their persistence:
/// - Type definitions (Workflow, WorkflowType, WorkflowDefinition)
/// - The WorkflowStore contract with its atomic conditional insert
/// - In-memory and SQLite store backends

// Core workflow type definitions
pub mod types;

// Store contract shared by all backends
pub mod store;

// Lock-scoped in-memory backend
pub mod memory;

// SQLite persistence backend
pub mod storage;

// Re-export commonly used types
pub use memory::InMemoryWorkflowStore;
pub use storage::SqliteWorkflowStore;
pub use store::{ConditionalInsert, StoreError, WorkflowStore};
pub use types::{Workflow, WorkflowDefinition, WorkflowType};
