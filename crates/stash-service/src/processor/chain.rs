use super::{CacheStage, RepositoryStage, SharedProcessor};
use stash_cache::{CachePolicy, DistributedLock, RecordCache};
use stash_core::{Record, StashError, StashResult};
use stash_repository::RecordReader;
use std::sync::Arc;

enum Tier<R: Record> {
    Cache(RecordCache, DistributedLock),
    Repository(Arc<dyn RecordReader<R>>),
}

/// Composes tiers front to back.
///
/// ```ignore
/// let chain = ChainBuilder::new()
///     .cache(local_cache, local_lock)
///     .cache(redis_cache, redis_lock)
///     .repository(reader)
///     .build()?;
/// ```
pub struct ChainBuilder<R: Record> {
    tiers: Vec<Tier<R>>,
    policy: CachePolicy,
}

impl<R: Record> Default for ChainBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> ChainBuilder<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tiers: Vec::new(),
            policy: CachePolicy::default(),
        }
    }

    /// Appends a cache tier.
    #[must_use]
    pub fn cache(mut self, cache: RecordCache, lock: DistributedLock) -> Self {
        self.tiers.push(Tier::Cache(cache, lock));
        self
    }

    /// Appends a backing-store tier.
    #[must_use]
    pub fn repository(mut self, reader: Arc<dyn RecordReader<R>>) -> Self {
        self.tiers.push(Tier::Repository(reader));
        self
    }

    /// Write-back policy of every cache tier.
    #[must_use]
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Links the tiers and returns the first one.
    pub fn build(self) -> StashResult<SharedProcessor<R>> {
        let policy = self.policy;
        let mut next: Option<SharedProcessor<R>> = None;

        for tier in self.tiers.into_iter().rev() {
            let stage: SharedProcessor<R> = match tier {
                Tier::Cache(cache, lock) => {
                    let stage = CacheStage::new(cache, lock).with_policy(policy);
                    Arc::new(match next.take() {
                        Some(next) => stage.with_next(next),
                        None => stage,
                    })
                }
                Tier::Repository(reader) => {
                    let stage = RepositoryStage::new(reader);
                    Arc::new(match next.take() {
                        Some(next) => stage.with_next(next),
                        None => stage,
                    })
                }
            };
            next = Some(stage);
        }

        next.ok_or_else(|| StashError::validation("processor chain has no tiers"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Blank;

    impl Record for Blank {}

    #[test]
    fn test_empty_chain_is_rejected() {
        let result = ChainBuilder::<Blank>::new().build();
        assert!(matches!(result, Err(StashError::Validation(_))));
    }
}
