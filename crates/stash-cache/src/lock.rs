//! Advisory distributed lock over a key-value backend.
//!
//! The lock is a SET-if-absent entry with a TTL. It bounds how many callers
//! read the backing store for the same key at once; it is not a mutex.
//! Release deletes the entry by key without checking who created it, so a
//! holder whose entry already expired can remove a newer holder's entry.
//! The TTL bounds how long a crashed or cancelled holder blocks others.

use crate::metrics::CacheMetrics;
use crate::SharedStore;
use stash_config::LockConfig;
use stash_core::StashResult;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Default lock TTL.
pub const DEFAULT_EXPIRE: Duration = Duration::from_millis(200);
/// Default number of cache polls by a caller that lost the lock.
pub const DEFAULT_RETRY_TIMES: u32 = 3;
/// Default sleep between polls.
pub const DEFAULT_RETRY_SPAN: Duration = Duration::from_micros(70);

/// Lock timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    /// TTL of the lock entry.
    pub expire: Duration,
    /// How many times a caller that lost the lock re-polls the cache.
    pub retry_times: u32,
    /// Sleep before each poll.
    pub retry_span: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            expire: DEFAULT_EXPIRE,
            retry_times: DEFAULT_RETRY_TIMES,
            retry_span: DEFAULT_RETRY_SPAN,
        }
    }
}

impl From<&LockConfig> for LockOptions {
    fn from(config: &LockConfig) -> Self {
        Self {
            expire: config.expire(),
            retry_times: config.retry_times,
            retry_span: config.retry_span(),
        }
    }
}

/// Advisory lock keyed by `{prefix}{key}`.
#[derive(Clone)]
pub struct DistributedLock {
    store: SharedStore,
    prefix: String,
    options: LockOptions,
}

impl DistributedLock {
    pub fn new(store: SharedStore, prefix: impl Into<String>, options: LockOptions) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> &LockOptions {
        &self.options
    }

    fn lock_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Tries to create the lock entry.
    ///
    /// Returns true only if this call created it. A backend failure counts
    /// as not acquired so that an unreachable lock backend never blocks
    /// reads.
    pub async fn acquire(&self, key: &str) -> bool {
        let lock_key = self.lock_key(key);
        match self.store.set_if_absent(&lock_key, key, self.options.expire).await {
            Ok(acquired) => {
                CacheMetrics::lock(acquired);
                debug!(lock_key = %lock_key, acquired, "Lock attempt");
                acquired
            }
            Err(e) => {
                CacheMetrics::lock_error();
                warn!(lock_key = %lock_key, error = %e, "Lock backend failed, proceeding without lock");
                false
            }
        }
    }

    /// Deletes the lock entry. Releasing an absent lock is a no-op.
    pub async fn release(&self, key: &str) -> StashResult<()> {
        let lock_key = self.lock_key(key);
        let deleted = self.store.delete(&[lock_key.clone()]).await?;
        debug!(lock_key = %lock_key, deleted, "Lock released");
        Ok(())
    }

    /// Polls `attempt` up to `retry_times` times, sleeping `retry_span`
    /// before each call, and returns the first `Some`.
    pub async fn poll<T, F, Fut>(&self, mut attempt: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        for _ in 0..self.options.retry_times {
            tokio::time::sleep(self.options.retry_span).await;
            if let Some(value) = attempt().await {
                return Some(value);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockStore;
    use crate::{KeyValueStore, MemoryStore};
    use stash_core::StashError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn memory_lock() -> (DistributedLock, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let lock = DistributedLock::new(store.clone(), "lock:person:", LockOptions::default());
        (lock, store)
    }

    #[test]
    fn test_default_options() {
        let options = LockOptions::default();
        assert_eq!(options.expire, Duration::from_millis(200));
        assert_eq!(options.retry_times, 3);
        assert_eq!(options.retry_span, Duration::from_micros(70));
    }

    #[test]
    fn test_options_from_config() {
        let config = LockConfig {
            expire_ms: 500,
            retry_times: 5,
            ..Default::default()
        };
        let options = LockOptions::from(&config);
        assert_eq!(options.expire, Duration::from_millis(500));
        assert_eq!(options.retry_times, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_is_exclusive_until_ttl() {
        let (lock, store) = memory_lock();

        assert!(lock.acquire("42").await);
        assert!(!lock.acquire("42").await);
        assert!(lock.acquire("43").await);
        assert_eq!(store.ttl("lock:person:42"), Some(Duration::from_millis(200)));

        tokio::time::advance(Duration::from_millis(201)).await;
        assert!(lock.acquire("42").await);
    }

    #[tokio::test]
    async fn test_entry_value_is_key() {
        let (lock, store) = memory_lock();
        lock.acquire("42").await;
        assert_eq!(store.get("lock:person:42").await.unwrap().as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let (lock, store) = memory_lock();

        assert!(lock.acquire("42").await);
        assert!(lock.acquire("7").await);

        lock.release("42").await.unwrap();
        lock.release("42").await.unwrap();
        lock.release("never-acquired").await.unwrap();

        assert!(store.get("lock:person:7").await.unwrap().is_some());
        assert!(lock.acquire("42").await);
    }

    #[tokio::test]
    async fn test_acquire_fails_open() {
        let mut store = MockStore::new();
        store
            .expect_set_if_absent()
            .returning(|_, _, _| Err(StashError::cache("connection refused")));

        let lock = DistributedLock::new(Arc::new(store), "lock:", LockOptions::default());
        assert!(!lock.acquire("42").await);
    }

    #[tokio::test]
    async fn test_release_surfaces_backend_error() {
        let mut store = MockStore::new();
        store
            .expect_delete()
            .returning(|_| Err(StashError::cache("connection refused")));

        let lock = DistributedLock::new(Arc::new(store), "lock:", LockOptions::default());
        assert!(lock.release("42").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_returns_first_hit() {
        let (lock, _store) = memory_lock();
        let calls = AtomicU32::new(0);

        let found = lock
            .poll(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { (n == 2).then_some(n) }
            })
            .await;

        assert_eq!(found, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_gives_up_after_retry_times() {
        let (lock, _store) = memory_lock();
        let calls = AtomicU32::new(0);

        let found: Option<()> = lock
            .poll(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { None }
            })
            .await;

        assert!(found.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
