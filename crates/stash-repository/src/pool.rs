//! Database connection pool management.

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use stash_config::DatabaseConfig;
use stash_core::{StashError, StashResult};
use std::sync::Arc;
use tracing::{info, warn};

/// Database pool wrapper.
pub struct DatabasePool {
    pool: MySqlPool,
}

impl DatabasePool {
    fn options(config: &DatabaseConfig) -> MySqlPoolOptions {
        MySqlPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .idle_timeout(Some(config.idle_timeout()))
    }

    /// Creates a new database pool from configuration.
    pub async fn new(config: &DatabaseConfig) -> StashResult<Self> {
        info!("Connecting to MySQL database...");

        let pool = Self::options(config).connect(&config.url).await.map_err(|e| {
            warn!("Failed to connect to database: {}", e);
            StashError::Database(format!("Failed to connect: {e}"))
        })?;

        info!("MySQL connection pool established");
        Ok(Self { pool })
    }

    /// Creates a pool that opens connections on first use.
    pub fn connect_lazy(config: &DatabaseConfig) -> StashResult<Self> {
        let pool = Self::options(config)
            .connect_lazy(&config.url)
            .map_err(|e| StashError::Configuration(format!("Invalid database URL: {e}")))?;
        Ok(Self { pool })
    }

    /// Returns a reference to the underlying pool.
    #[must_use]
    pub fn inner(&self) -> &MySqlPool {
        &self.pool
    }

    /// Checks if the database connection is healthy.
    pub async fn health_check(&self) -> StashResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StashError::Database(format!("Health check failed: {e}")))?;
        Ok(())
    }

    /// Closes the database pool.
    pub async fn close(&self) {
        info!("Closing database connection pool...");
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

impl std::ops::Deref for DatabasePool {
    type Target = MySqlPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

impl std::fmt::Debug for DatabasePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabasePool")
            .field("size", &self.pool.size())
            .field("num_idle", &self.pool.num_idle())
            .finish()
    }
}

/// Creates a shared database pool.
pub async fn create_pool(config: &DatabaseConfig) -> StashResult<Arc<DatabasePool>> {
    let pool = DatabasePool::new(config).await?;
    Ok(Arc::new(pool))
}
