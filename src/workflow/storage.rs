/// SQLite persistence layer for workflow storage
///
/// Stores workflow records in a single `workflows` table. Business state is kept as
/// serialized JSON text; type identity and the single-instance flag are real columns so the
/// database itself can enforce single-instance uniqueness.

use crate::config::StoreConfig;
use crate::workflow::store::{ConditionalInsert, StoreError, WorkflowStore};
use crate::workflow::types::{Workflow, WorkflowType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow},
    Row,
};
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// SQLite-based workflow store
///
/// Uses a partial unique index on `workflow_type` for single-instance rows, and a
/// single `INSERT ... SELECT ... WHERE NOT EXISTS` statement for the conditional
/// insert. SQLite serializes writers, so the existence check and the write of that
/// statement cannot interleave with another registration.
#[derive(Debug, Clone)]
pub struct SqliteWorkflowStore {
    /// SQLite connection pool for the workflow database
    pool: SqlitePool,
}

impl SqliteWorkflowStore {
    /// Create new store instance over an existing pool
    ///
    /// The schema is not touched; call [`init_schema`](Self::init_schema) once.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database described by `config` and initialize the schema
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            StoreError::Database(format!(
                "failed to create data directory '{}': {}",
                config.data_dir, e
            ))
        })?;

        let db_path = config.database_path();
        tracing::info!("Opening workflow store: {}", db_path.display());

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout());
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(database_error)?;

        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the workflow storage schema
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                id TEXT PRIMARY KEY,
                workflow_type TEXT NOT NULL,
                is_single_instance INTEGER NOT NULL,
                -- TEXT affinity, so a bare numeric state is not coerced to a number
                state TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_workflows_type
            ON workflows(workflow_type)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        // At most one single-instance row per type, whatever path wrote it
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_workflows_single_instance
            ON workflows(workflow_type) WHERE is_single_instance = 1
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for SqliteWorkflowStore {
    #[instrument(skip(self), fields(workflow_type = %workflow_type))]
    async fn get_all_by_type(
        &self,
        workflow_type: &WorkflowType,
    ) -> Result<Vec<Workflow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, workflow_type, is_single_instance, state, created_at
            FROM workflows
            WHERE workflow_type = ?
            "#,
        )
        .bind(workflow_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load workflows by type: {}", e);
            database_error(e)
        })?;

        rows.iter().map(workflow_from_row).collect()
    }

    #[instrument(skip(self, workflow), fields(id = %workflow.id, workflow_type = %workflow.workflow_type))]
    async fn insert(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let state_json = serde_json::to_string(&workflow.state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO workflows (id, workflow_type, is_single_instance, state, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(workflow.id.to_string())
        .bind(workflow.workflow_type.as_str())
        .bind(workflow.is_single_instance)
        .bind(&state_json)
        .bind(workflow.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, workflow))?;

        debug!("inserted workflow");
        Ok(())
    }

    #[instrument(skip(self, workflow), fields(id = %workflow.id, workflow_type = %workflow.workflow_type))]
    async fn insert_if_type_absent(
        &self,
        workflow: &Workflow,
    ) -> Result<ConditionalInsert, StoreError> {
        let state_json = serde_json::to_string(&workflow.state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO workflows (id, workflow_type, is_single_instance, state, created_at)
            SELECT ?, ?, ?, ?, ?
            WHERE NOT EXISTS (SELECT 1 FROM workflows WHERE workflow_type = ?)
            "#,
        )
        .bind(workflow.id.to_string())
        .bind(workflow.workflow_type.as_str())
        .bind(workflow.is_single_instance)
        .bind(&state_json)
        .bind(workflow.created_at.to_rfc3339())
        .bind(workflow.workflow_type.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => {
                debug!("inserted workflow, type was absent");
                Ok(ConditionalInsert::Inserted)
            }
            Ok(_) => {
                let existing = self.count_by_type(&workflow.workflow_type).await?;
                debug!(existing, "type already present, nothing inserted");
                Ok(ConditionalInsert::Conflict { existing })
            }
            Err(e) => match insert_error(e, workflow) {
                StoreError::SingleInstanceConflict { .. } => {
                    Ok(ConditionalInsert::Conflict { existing: 1 })
                }
                other => Err(other),
            },
        }
    }

    #[instrument(skip(self))]
    async fn get(&self, id: Uuid) -> Result<Option<Workflow>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, workflow_type, is_single_instance, state, created_at
            FROM workflows
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.as_ref().map(workflow_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(workflow_type = %workflow_type))]
    async fn count_by_type(&self, workflow_type: &WorkflowType) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workflows WHERE workflow_type = ?")
            .bind(workflow_type.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(database_error)?;

        Ok(count as usize)
    }
}

fn database_error(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Classify a failed insert: primary key and single-instance index violations
/// become their own variants, everything else is a database error.
fn insert_error(e: sqlx::Error, workflow: &Workflow) -> StoreError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            // SQLite names the violated columns: "workflows.id" for the key,
            // "workflows.workflow_type" for the partial index.
            if db_err.message().contains("workflows.id") {
                return StoreError::DuplicateId(workflow.id);
            }
            return StoreError::SingleInstanceConflict {
                workflow_type: workflow.workflow_type.clone(),
            };
        }
    }
    error!("Failed to insert workflow {}: {}", workflow.id, e);
    database_error(e)
}

fn workflow_from_row(row: &SqliteRow) -> Result<Workflow, StoreError> {
    let id: String = row.try_get("id").map_err(database_error)?;
    let workflow_type: String = row.try_get("workflow_type").map_err(database_error)?;
    let is_single_instance: bool = row.try_get("is_single_instance").map_err(database_error)?;
    let state_json: String = row.try_get("state").map_err(database_error)?;
    let created_at: String = row.try_get("created_at").map_err(database_error)?;

    Ok(Workflow {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::Serialization(e.to_string()))?,
        workflow_type: WorkflowType::new(workflow_type),
        is_single_instance,
        state: serde_json::from_str(&state_json)
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StoreError::Serialization(e.to_string()))?
            .with_timezone(&Utc),
    })
}
