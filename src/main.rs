/// workgate store bootstrap
///
/// Opens (or creates) the SQLite workflow store described by the environment and
/// provisions its schema, so engine processes can start registering workflows.

use tracing_subscriber::EnvFilter;
use workgate::{config::Config, SqliteWorkflowStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    // Defaults to ./data/workflows.db, overridable via WORKGATE_* variables
    let config = Config::default();
    tracing::info!("📁 Provisioning workflow store in {}", config.store.data_dir);

    let store = SqliteWorkflowStore::open(&config.store).await?;
    store.pool().close().await;

    tracing::info!(
        "✅ Workflow store ready: {}",
        config.store.database_path().display()
    );
    Ok(())
}
