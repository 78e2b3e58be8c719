//! Multi-key read-through.

use stash_cache::metrics::CacheMetrics;
use stash_cache::{CachePolicy, DistributedLock, RecordCache};
use stash_core::{
    collect_values, require_is_empty, require_key, Predicate, Record, StashResult, Traversable,
    Value,
};
use stash_repository::RecordReader;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const PATH: &str = "multi";

/// How much of a batch the cache could serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Every param has a non-empty cached record.
    All,
    /// Some params have no usable cached record.
    Partial,
}

/// Cached records split by whether they satisfy their param.
#[derive(Debug)]
pub struct Partition<R> {
    /// Non-empty records for satisfied params, in param order.
    pub satisfied: Vec<R>,
    /// Params with no usable cached record, in param order.
    pub missing: Vec<String>,
}

impl<R> Partition<R> {
    #[must_use]
    pub fn status(&self) -> CacheStatus {
        if self.missing.is_empty() {
            CacheStatus::All
        } else {
            CacheStatus::Partial
        }
    }
}

/// Splits positional cache results into satisfied records and missing
/// params. A record satisfies a param when its key equals the param's value
/// and it is not empty. A repeated param counts once.
pub fn partition<R: Record>(params: &[String], cached: Vec<Option<R>>) -> StashResult<Partition<R>> {
    let mut by_key = HashMap::new();
    for record in cached.into_iter().flatten() {
        if require_is_empty(&record)? {
            continue;
        }
        by_key.insert(require_key(&record)?, record);
    }

    let mut satisfied = Vec::with_capacity(params.len());
    let mut missing = Vec::new();
    let mut seen = HashSet::with_capacity(params.len());
    for param in params {
        if !seen.insert(param.as_str()) {
            continue;
        }
        match by_key.remove(param) {
            Some(record) => satisfied.push(record),
            None => missing.push(param.clone()),
        }
    }
    Ok(Partition { satisfied, missing })
}

/// Drops repeated values, keeping first occurrences in order.
fn distinct(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(values.len());
    values.into_iter().filter(|value| seen.insert(value.clone())).collect()
}

/// Reads a keyed batch through the cache.
///
/// The whole batch shares one lock keyed by the joined param values. On a
/// partial hit the full batch is re-read from the backing store with the
/// caller's predicate and written back in one call, one entry per record.
pub struct MultiCacheRepoReader<R: Record> {
    cache: RecordCache,
    lock: DistributedLock,
    reader: Arc<dyn RecordReader<R>>,
    policy: CachePolicy,
}

impl<R: Record> Clone for MultiCacheRepoReader<R> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            lock: self.lock.clone(),
            reader: Arc::clone(&self.reader),
            policy: self.policy,
        }
    }
}

impl<R: Record> MultiCacheRepoReader<R> {
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

    /// Reads the records for `params`.
    ///
    /// A fully cached batch comes back in param order. Otherwise the result
    /// is whatever the backing store returns for `predicate`.
    #[instrument(skip_all, fields(batch = tracing::field::Empty))]
    pub async fn read<P>(&self, params: &P, predicate: &Predicate, expiry: Duration) -> StashResult<Vec<R>>
    where
        P: Traversable + Sync + ?Sized,
        P::Item: Value,
    {
        let sample = R::default();
        require_key(&sample)?;
        require_is_empty(&sample)?;

        let values = distinct(collect_values(params)?);
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let batch_key = values.join(",");
        tracing::Span::current().record("batch", batch_key.as_str());

        let missing = match self.cached(&values).await {
            Ok(found) if found.status() == CacheStatus::All => {
                CacheMetrics::hit(PATH);
                debug!(count = found.satisfied.len(), "Batch served from cache");
                return Ok(found.satisfied);
            }
            Ok(found) => found.missing.len(),
            Err(e) if e.is_contract_violation() => return Err(e),
            Err(e) => {
                CacheMetrics::read_error(PATH);
                warn!(error = %e, "Batch cache read failed, falling back to backing store");
                values.len()
            }
        };
        CacheMetrics::miss(PATH);
        debug!(missing, total = values.len(), "Batch partially cached");

        let acquired = self.lock.acquire(&batch_key).await;
        if !acquired {
            let values = values.as_slice();
            let polled = self
                .lock
                .poll(move || async move {
                    match self.cached(values).await {
                        Ok(found) if found.status() == CacheStatus::All => Some(found.satisfied),
                        _ => None,
                    }
                })
                .await;
            if let Some(records) = polled {
                CacheMetrics::hit(PATH);
                return Ok(records);
            }
        }

        let result = self.load(predicate, expiry).await;

        // Only the caller that created the lock entry deletes it.
        if acquired {
            if let Err(e) = self.lock.release(&batch_key).await {
                warn!(error = %e, "Batch lock release failed, entry will expire");
            }
        }
        result
    }

    async fn cached(&self, values: &[String]) -> StashResult<Partition<R>> {
        let cached = self.cache.read_many::<R>(values).await?;
        partition(values, cached)
    }

    async fn load(&self, predicate: &Predicate, expiry: Duration) -> StashResult<Vec<R>> {
        CacheMetrics::backing_read(PATH);
        let records = self.reader.find_many(predicate).await?;
        let ttl = self.policy.expiry_for(expiry, false);

        if let Err(e) = self.cache.write_all(&records, ttl).await {
            if e.is_contract_violation() {
                return Err(e);
            }
            CacheMetrics::write_back_failed(PATH);
            warn!(error = %e, "Batch cache write-back failed");
        } else {
            debug!(count = records.len(), "Batch written back");
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use stash_core::{IsEmpty, Key};

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: i64,
    }

    impl Key for Item {
        fn key(&self) -> String {
            self.id.to_string()
        }
    }

    impl IsEmpty for Item {
        fn is_empty(&self) -> bool {
            self.id == 0
        }
    }

    impl Record for Item {
        fn as_key(&self) -> Option<&dyn Key> {
            Some(self)
        }

        fn as_is_empty(&self) -> Option<&dyn IsEmpty> {
            Some(self)
        }
    }

    fn params(ids: &[i64]) -> Vec<String> {
        ids.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_partition_all() {
        let cached = vec![Some(Item { id: 2 }), Some(Item { id: 1 })];
        let found = partition(&params(&[1, 2]), cached).unwrap();
        assert_eq!(found.status(), CacheStatus::All);
        assert_eq!(found.satisfied, vec![Item { id: 1 }, Item { id: 2 }]);
    }

    #[test]
    fn test_partition_partial() {
        let cached = vec![Some(Item { id: 1 }), None, Some(Item { id: 3 })];
        let found = partition(&params(&[1, 2, 3]), cached).unwrap();
        assert_eq!(found.status(), CacheStatus::Partial);
        assert_eq!(found.missing, vec!["2".to_string()]);
        assert_eq!(found.satisfied.len(), 2);
    }

    #[test]
    fn test_partition_ignores_empty_records() {
        let cached = vec![Some(Item::default())];
        let found = partition(&params(&[5]), cached).unwrap();
        assert_eq!(found.missing, vec!["5".to_string()]);
    }

    #[test]
    fn test_partition_repeated_params_count_once() {
        let cached = vec![Some(Item { id: 7 }), Some(Item { id: 7 })];
        let found = partition(&params(&[7, 7]), cached).unwrap();
        assert_eq!(found.status(), CacheStatus::All);
        assert_eq!(found.satisfied, vec![Item { id: 7 }]);

        let found = partition::<Item>(&params(&[8, 8]), vec![None, None]).unwrap();
        assert_eq!(found.missing, vec!["8".to_string()]);
    }

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        assert_eq!(distinct(params(&[7, 8, 7, 9, 8])), params(&[7, 8, 9]));
    }
}
