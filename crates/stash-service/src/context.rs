//! Explicitly initialized handles shared by every reader.

use crate::{MultiCacheRepoReader, OneCacheRepoReader};
use sqlx::mysql::MySqlRow;
use sqlx::FromRow;
use stash_cache::{
    create_pool, metrics, tracing_exec_log, CachePolicy, DistributedLock, ExecLogFn, InstrumentedStore,
    KeyValueStore, Keyspace, LockOptions, MemoryStore, RecordCache, RedisStore, SharedStore,
};
use stash_config::{format_validation_errors, ConfigValidator, RedisConfig, StashConfig};
use stash_core::{Record, StashError, StashResult};
use stash_repository::{DatabasePool, MySqlRecordReader, RecordReader};
use std::sync::Arc;
use tracing::info;

/// The key-value store, the database pool and the policies derived from
/// configuration, created once and handed to readers.
#[derive(Clone)]
pub struct StashContext {
    store: SharedStore,
    database: Option<Arc<DatabasePool>>,
    policy: CachePolicy,
    lock_prefix: String,
    lock_options: LockOptions,
    cache_prefix: String,
}

impl StashContext {
    /// Validates `config` and connects to the configured backends.
    ///
    /// With Redis disabled the cache lives in a process-local store.
    pub async fn connect(config: &StashConfig) -> StashResult<Self> {
        ConfigValidator::validate(config)
            .map_err(|errors| StashError::Configuration(format_validation_errors(&errors)))?;

        if config.observability.metrics_enabled {
            metrics::register_metrics();
        }

        let exec_log = config.observability.exec_log.then(tracing_exec_log);
        let store = backend_store(&config.redis, exec_log).await?;

        let database = stash_repository::create_pool(&config.database).await?;
        info!(app = %config.app.name, "Stash context ready");

        Ok(Self::from_parts(store, Some(database), config))
    }

    /// Builds a context from an existing store and optional pool.
    #[must_use]
    pub fn from_parts(store: SharedStore, database: Option<Arc<DatabasePool>>, config: &StashConfig) -> Self {
        Self {
            store,
            database,
            policy: CachePolicy::from(&config.cache),
            lock_prefix: config.lock.prefix.clone(),
            lock_options: LockOptions::from(&config.lock),
            cache_prefix: config.cache.prefix.clone(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Returns the database pool or a configuration error if none was set up.
    pub fn database(&self) -> StashResult<&Arc<DatabasePool>> {
        self.database
            .as_ref()
            .ok_or_else(|| StashError::Configuration("no database pool configured".to_string()))
    }

    #[must_use]
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    #[must_use]
    pub fn lock_options(&self) -> LockOptions {
        self.lock_options
    }

    /// Lock for one business domain, keyed `{lock prefix}{biz}:{key}`.
    #[must_use]
    pub fn lock(&self, biz: &str) -> DistributedLock {
        DistributedLock::new(
            Arc::clone(&self.store),
            format!("{}{}:", self.lock_prefix, biz),
            self.lock_options,
        )
    }

    /// Cache for one business domain, keyed `{cache prefix}{prefix}{key}`.
    #[must_use]
    pub fn record_cache(&self, prefix: &str) -> RecordCache {
        RecordCache::new(
            Arc::clone(&self.store),
            Keyspace::new(format!("{}{}", self.cache_prefix, prefix)),
        )
    }

    /// Single-key reader for `biz`, reading `reader` on a miss.
    #[must_use]
    pub fn one_reader<R: Record>(&self, biz: &str, reader: Arc<dyn RecordReader<R>>) -> OneCacheRepoReader<R> {
        OneCacheRepoReader::new(self.record_cache(&format!("{biz}:")), self.lock(biz), reader)
            .with_policy(self.policy)
    }

    /// Multi-key reader for `biz`, reading `reader` on a miss.
    #[must_use]
    pub fn multi_reader<R: Record>(&self, biz: &str, reader: Arc<dyn RecordReader<R>>) -> MultiCacheRepoReader<R> {
        MultiCacheRepoReader::new(self.record_cache(&format!("{biz}:")), self.lock(biz), reader)
            .with_policy(self.policy)
    }

    /// MySQL reader over `table` using the context's pool.
    pub fn mysql_reader<R>(&self, table: &str, columns: &[&str]) -> StashResult<Arc<dyn RecordReader<R>>>
    where
        R: Record + for<'r> FromRow<'r, MySqlRow> + Unpin,
    {
        let reader = MySqlRecordReader::<R>::new(Arc::clone(self.database()?), table, columns)?;
        Ok(Arc::new(reader))
    }
}

impl std::fmt::Debug for StashContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StashContext")
            .field("database", &self.database.is_some())
            .field("policy", &self.policy)
            .field("lock_prefix", &self.lock_prefix)
            .field("cache_prefix", &self.cache_prefix)
            .finish_non_exhaustive()
    }
}

/// Opens the configured cache backend, reporting to `exec_log` if given.
async fn backend_store(redis: &RedisConfig, exec_log: Option<ExecLogFn>) -> StashResult<SharedStore> {
    if redis.enabled {
        let store = RedisStore::new(create_pool(redis).await?);
        Ok(instrument(store, exec_log))
    } else {
        info!("Redis disabled, using process-local store");
        Ok(instrument(MemoryStore::new(), exec_log))
    }
}

fn instrument<S: KeyValueStore + 'static>(store: S, exec_log: Option<ExecLogFn>) -> SharedStore {
    match exec_log {
        Some(log) => Arc::new(InstrumentedStore::new(store, log)),
        None => Arc::new(store),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use stash_cache::ExecRecord;
    use std::time::Duration;

    fn memory_context() -> (StashContext, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let context = StashContext::from_parts(store.clone(), None, &StashConfig::default());
        (context, store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_key_layout() {
        let (context, store) = memory_context();
        let lock = context.lock("person");
        assert!(lock.acquire("42").await);
        assert_eq!(store.get("stash:lock:person:42").await.unwrap(), Some("42".to_string()));
    }

    #[test]
    fn test_record_cache_prefix() {
        let (context, _) = memory_context();
        let cache = context.record_cache("person:");
        assert_eq!(cache.keyspace().derive("1"), "stash:cache:person:1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_uses_configured_options() {
        let mut config = StashConfig::default();
        config.lock.retry_times = 5;
        let context = StashContext::from_parts(Arc::new(MemoryStore::new()), None, &config);
        let lock = context.lock("person");
        assert_eq!(lock.options().retry_times, 5);
        assert_eq!(lock.options().expire, Duration::from_millis(200));
    }

    #[test]
    fn test_missing_database_is_configuration_error() {
        let (context, _) = memory_context();
        assert!(matches!(context.database(), Err(StashError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let mut config = StashConfig::default();
        config.cache.prefix = String::new();
        let result = StashContext::connect(&config).await;
        assert!(matches!(result, Err(StashError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_disabled_redis_store_reports_exec_log() {
        let records = Arc::new(Mutex::new(Vec::<ExecRecord>::new()));
        let sink = Arc::clone(&records);
        let log: ExecLogFn = Arc::new(move |record: &ExecRecord| sink.lock().push(record.clone()));
        let redis = RedisConfig {
            enabled: false,
            ..RedisConfig::default()
        };

        let store = backend_store(&redis, Some(log)).await.unwrap();
        store.set("k", "v", Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(records.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_disabled_redis_store_without_exec_log() {
        let redis = RedisConfig {
            enabled: false,
            ..RedisConfig::default()
        };
        let store = backend_store(&redis, None).await.unwrap();
        store.set("k", "v", Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
