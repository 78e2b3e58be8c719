use super::{ReadOutcome, ReadProcessor, SharedProcessor};
use async_trait::async_trait;
use stash_cache::metrics::CacheMetrics;
use stash_cache::{CachePolicy, DistributedLock, RecordCache};
use stash_core::{Lookup, Record, StashResult};
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, warn};

const PATH: &str = "chain";

/// A cache tier over any key-value store.
///
/// Misses are delegated to `next` behind the stage's own lock and the
/// result is written back into this tier. Without `next`, a miss is
/// [`ReadOutcome::NoData`].
pub struct CacheStage<R: Record> {
    cache: RecordCache,
    lock: DistributedLock,
    policy: CachePolicy,
    next: Option<SharedProcessor<R>>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> CacheStage<R> {
    pub fn new(cache: RecordCache, lock: DistributedLock) -> Self {
        Self {
            cache,
            lock,
            policy: CachePolicy::default(),
            next: None,
            _record: PhantomData,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_next(mut self, next: SharedProcessor<R>) -> Self {
        self.next = Some(next);
        self
    }

    /// Reads this tier only. Read errors count as a miss.
    async fn read_own(&self, lookup: &Lookup, out: &mut R) -> Option<ReadOutcome> {
        match self.cache.read::<R>(lookup.key()).await {
            Ok(Some(record)) => {
                *out = record;
                Some(if is_empty(out) { ReadOutcome::NoData } else { ReadOutcome::Hit })
            }
            Ok(None) => None,
            Err(e) => {
                CacheMetrics::read_error(PATH);
                warn!(key = %lookup.key(), error = %e, "Tier read failed, treating as miss");
                None
            }
        }
    }

    async fn fill(
        &self,
        next: &SharedProcessor<R>,
        lookup: &Lookup,
        out: &mut R,
        expiry: Duration,
    ) -> StashResult<ReadOutcome> {
        CacheMetrics::backing_read(PATH);
        let outcome = next.read(lookup, out, expiry).await?;

        let write_back = match outcome {
            ReadOutcome::Hit => true,
            ReadOutcome::NoData => {
                *out = R::default();
                out.as_is_empty().is_some()
            }
        };
        if write_back {
            if let Err(e) = self.write(lookup, out, expiry).await {
                CacheMetrics::write_back_failed(PATH);
                warn!(key = %lookup.key(), error = %e, "Tier write-back failed");
            }
        }
        Ok(outcome)
    }
}

fn is_empty<R: Record>(record: &R) -> bool {
    record.as_is_empty().is_some_and(|marker| marker.is_empty())
}

#[async_trait]
impl<R: Record> ReadProcessor<R> for CacheStage<R> {
    async fn read(&self, lookup: &Lookup, out: &mut R, expiry: Duration) -> StashResult<ReadOutcome> {
        if let Some(outcome) = self.read_own(lookup, out).await {
            CacheMetrics::hit(PATH);
            return Ok(outcome);
        }
        CacheMetrics::miss(PATH);

        let Some(next) = &self.next else {
            debug!(key = %lookup.key(), "Last tier missed");
            *out = R::default();
            return Ok(ReadOutcome::NoData);
        };

        let key = lookup.key();
        let acquired = self.lock.acquire(key).await;
        if !acquired {
            let polled = self
                .lock
                .poll(move || async move { self.cache.read::<R>(key).await.ok().flatten() })
                .await;
            if let Some(record) = polled {
                CacheMetrics::hit(PATH);
                *out = record;
                return Ok(if is_empty(out) { ReadOutcome::NoData } else { ReadOutcome::Hit });
            }
        }

        let result = self.fill(next, lookup, out, expiry).await;

        // Only the caller that created the lock entry deletes it.
        if acquired {
            if let Err(e) = self.lock.release(key).await {
                warn!(key = %key, error = %e, "Tier lock release failed, entry will expire");
            }
        }
        result
    }

    async fn write(&self, lookup: &Lookup, record: &R, expiry: Duration) -> StashResult<()> {
        let empty = is_empty(record);
        if empty {
            CacheMetrics::negative_write(PATH);
        }
        let ttl = self.policy.expiry_for(expiry, empty);
        self.cache.write_as(lookup.key(), record, ttl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stash_cache::{Keyspace, LockOptions, MemoryStore, SharedStore};
    use serde::{Deserialize, Serialize};
    use stash_core::IsEmpty;
    use std::sync::Arc;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Flag {
        on: bool,
    }

    impl IsEmpty for Flag {
        fn is_empty(&self) -> bool {
            !self.on
        }
    }

    impl Record for Flag {
        fn as_is_empty(&self) -> Option<&dyn IsEmpty> {
            Some(self)
        }
    }

    fn stage(store: &Arc<MemoryStore>) -> CacheStage<Flag> {
        let shared: SharedStore = store.clone();
        CacheStage::new(
            RecordCache::new(shared.clone(), Keyspace::new("t:")),
            DistributedLock::new(shared, "l:", LockOptions::default()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_tier_miss_is_no_data() {
        let store = Arc::new(MemoryStore::new());
        let mut out = Flag { on: true };
        let outcome = stage(&store)
            .read(&Lookup::by("id", 1_i64), &mut out, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(outcome, ReadOutcome::NoData);
        assert_eq!(out, Flag::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_then_read_hits() {
        let store = Arc::new(MemoryStore::new());
        let stage = stage(&store);
        let lookup = Lookup::by("id", 1_i64);
        stage.write(&lookup, &Flag { on: true }, Duration::from_secs(5)).await.unwrap();
        assert_eq!(store.ttl("t:1"), Some(Duration::from_secs(5)));

        let mut out = Flag::default();
        let outcome = stage.read(&lookup, &mut out, Duration::from_secs(5)).await.unwrap();
        assert!(outcome.is_hit());
        assert!(out.on);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_write_uses_negative_ttl() {
        let store = Arc::new(MemoryStore::new());
        let stage = stage(&store);
        let lookup = Lookup::by("id", 2_i64);
        stage.write(&lookup, &Flag::default(), Duration::from_secs(5)).await.unwrap();
        assert_eq!(store.ttl("t:2"), Some(Duration::from_millis(200)));

        let mut out = Flag { on: true };
        let outcome = stage.read(&lookup, &mut out, Duration::from_secs(5)).await.unwrap();
        assert_eq!(outcome, ReadOutcome::NoData);
    }
}
