//! Single-key read-through.

use stash_cache::metrics::CacheMetrics;
use stash_cache::{CachePolicy, DistributedLock, RecordCache};
use stash_core::{ensure_is_empty, require_is_empty, Lookup, Record, StashResult};
use stash_repository::RecordReader;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const PATH: &str = "one";

/// Reads one record through the cache, falling back to the backing store.
///
/// On a miss the fallback is serialized behind a [`DistributedLock`] keyed
/// by the lookup key. Callers that lose the lock poll the cache a few times
/// before reading the backing store themselves. The result is written back
/// under the lookup key, with the negative TTL when it is empty.
pub struct OneCacheRepoReader<R: Record> {
    cache: RecordCache,
    lock: DistributedLock,
    reader: Arc<dyn RecordReader<R>>,
    policy: CachePolicy,
}

impl<R: Record> Clone for OneCacheRepoReader<R> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            lock: self.lock.clone(),
            reader: Arc::clone(&self.reader),
            policy: self.policy,
        }
    }
}

impl<R: Record> OneCacheRepoReader<R> {
    pub fn new(cache: RecordCache, lock: DistributedLock, reader: Arc<dyn RecordReader<R>>) -> Self {
        Self {
            cache,
            lock,
            reader,
            policy: CachePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_lock(mut self, lock: DistributedLock) -> Self {
        self.lock = lock;
        self
    }

    /// Returns the write-back policy.
    #[must_use]
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Reads the record for `lookup`.
    ///
    /// A cached negative entry is returned as is; the caller checks
    /// `is_empty()`. Only backing-store errors and a record type without
    /// `IsEmpty` reach the caller. Cache and lock failures degrade to a
    /// backing-store read.
    #[instrument(skip(self, lookup), fields(key = %lookup.key()))]
    pub async fn read(&self, lookup: &Lookup, expiry: Duration) -> StashResult<R> {
        ensure_is_empty::<R>()?;
        let key = lookup.key();

        match self.cache.read::<R>(key).await {
            Ok(Some(record)) => {
                CacheMetrics::hit(PATH);
                debug!("Cache hit");
                return Ok(record);
            }
            Ok(None) => {
                CacheMetrics::miss(PATH);
                debug!("Cache miss");
            }
            Err(e) => {
                CacheMetrics::read_error(PATH);
                warn!(error = %e, "Cache read failed, falling back to backing store");
            }
        }

        let acquired = self.lock.acquire(key).await;
        if !acquired {
            let polled = self
                .lock
                .poll(move || async move { self.cache.read::<R>(key).await.ok().flatten() })
                .await;
            if let Some(record) = polled {
                CacheMetrics::hit(PATH);
                debug!("Cache filled by lock holder");
                return Ok(record);
            }
            debug!("Lock holder did not fill the cache in time");
        }

        let result = self.load(lookup, expiry).await;

        // Only the caller that created the lock entry deletes it.
        if acquired {
            if let Err(e) = self.lock.release(key).await {
                warn!(error = %e, "Lock release failed, entry will expire");
            }
        }
        result
    }

    async fn load(&self, lookup: &Lookup, expiry: Duration) -> StashResult<R> {
        CacheMetrics::backing_read(PATH);
        let record = self
            .reader
            .find_one(lookup.predicate())
            .await?
            .unwrap_or_default();

        let empty = require_is_empty(&record)?;
        if empty {
            CacheMetrics::negative_write(PATH);
        }
        let ttl = self.policy.expiry_for(expiry, empty);

        if let Err(e) = self.cache.write_as(lookup.key(), &record, ttl).await {
            CacheMetrics::write_back_failed(PATH);
            warn!(error = %e, "Cache write-back failed");
        } else {
            debug!(ttl_ms = ttl.as_millis(), empty, "Cache written back");
        }
        Ok(record)
    }
}
