/// Configuration management for workgate
///
/// Handles workflow store location and connection parameters.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workflow store configuration
    pub store: StoreConfig,
}

/// SQLite workflow store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the database file (default: "data")
    pub data_dir: String,
    /// Database file name inside `data_dir` (default: "workflows.db")
    pub database_file: String,
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    /// Full path of the database file
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.database_file)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StoreConfig {
    /// Default store configuration with ENV_VAR overrides for container deployment
    fn default() -> Self {
        Self {
            data_dir: std::env::var("WORKGATE_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            database_file: std::env::var("WORKGATE_DATABASE_FILE")
                .unwrap_or_else(|_| "workflows.db".to_string()),
            max_connections: std::env::var("WORKGATE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8),
            busy_timeout_ms: std::env::var("WORKGATE_BUSY_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5_000),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
        }
    }
}
