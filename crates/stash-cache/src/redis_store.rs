//! Redis-backed key-value store.

use crate::KeyValueStore;
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use stash_config::RedisConfig;
use stash_core::{StashError, StashResult};
use std::time::Duration;
use tracing::{debug, info};

/// Create a Redis connection pool and check it answers `PING`.
pub async fn create_pool(config: &RedisConfig) -> StashResult<Pool> {
    info!("Creating Redis connection pool...");

    let pool = Config::from_url(&config.url)
        .builder()
        .map_err(|e| StashError::Configuration(format!("Invalid Redis config: {e}")))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| StashError::Configuration(format!("Failed to create Redis pool: {e}")))?;

    let mut conn = pool
        .get()
        .await
        .map_err(|e| StashError::cache(format!("Failed to get Redis connection: {e}")))?;
    redis::cmd("PING")
        .query_async::<String>(&mut *conn)
        .await
        .map_err(|e| StashError::cache(format!("Redis PING failed: {e}")))?;

    info!("Redis connection pool created successfully");
    Ok(pool)
}

/// Expiry in whole milliseconds. Redis rejects a zero `PX`.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Redis key-value store over a deadpool connection pool.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> StashResult<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| StashError::cache(format!("Failed to get Redis connection: {e}")))
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> StashResult<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| StashError::cache(format!("Failed to get key '{key}': {e}")))?;

        match &value {
            Some(_) => debug!("Cache hit for key '{}'", key),
            None => debug!("Cache miss for key '{}'", key),
        }
        Ok(value)
    }

    async fn get_many(&self, keys: &[String]) -> StashResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn().await?;
        // MGET always replies with an array, even for a single key.
        redis::cmd("MGET")
            .arg(keys)
            .query_async::<Vec<Option<String>>>(&mut *conn)
            .await
            .map_err(|e| StashError::cache(format!("Failed to get {} keys: {e}", keys.len())))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StashResult<()> {
        let mut conn = self.conn().await?;
        let ttl_ms = ttl_millis(ttl);

        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_ms)
            .query_async::<()>(&mut *conn)
            .await
            .map_err(|e| StashError::cache(format!("Failed to set key '{key}': {e}")))?;

        debug!("Cached key '{}' with TTL {}ms", key, ttl_ms);
        Ok(())
    }

    async fn set_many(&self, entries: &[(String, String)], ttl: Duration) -> StashResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn().await?;
        let ttl_ms = ttl_millis(ttl);

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            pipe.cmd("SET").arg(key).arg(value).arg("PX").arg(ttl_ms).ignore();
        }
        pipe.query_async::<()>(&mut *conn)
            .await
            .map_err(|e| StashError::cache(format!("Failed to set {} keys: {e}", entries.len())))?;

        debug!("Cached {} keys with TTL {}ms", entries.len(), ttl_ms);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StashResult<bool> {
        let mut conn = self.conn().await?;

        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut *conn)
            .await
            .map_err(|e| StashError::cache(format!("Failed to set-if-absent key '{key}': {e}")))?;

        Ok(result.is_some())
    }

    async fn delete(&self, keys: &[String]) -> StashResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn().await?;
        let deleted: u64 = conn
            .del(keys)
            .await
            .map_err(|e| StashError::cache(format!("Failed to delete keys: {e}")))?;

        debug!("Deleted {} of {} keys", deleted, keys.len());
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_millis_clamps_to_one() {
        assert_eq!(ttl_millis(Duration::ZERO), 1);
        assert_eq!(ttl_millis(Duration::from_micros(70)), 1);
        assert_eq!(ttl_millis(Duration::from_millis(200)), 200);
        assert_eq!(ttl_millis(Duration::from_secs(10)), 10_000);
    }

    #[tokio::test]
    async fn test_create_pool_rejects_bad_url() {
        let config = RedisConfig {
            url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(create_pool(&config).await.is_err());
    }
}
