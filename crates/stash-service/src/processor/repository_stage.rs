use super::{ReadOutcome, ReadProcessor, SharedProcessor};
use async_trait::async_trait;
use stash_core::{Lookup, Record, StashError, StashResult};
use stash_repository::RecordReader;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The backing-store tier.
///
/// Backing-store errors are returned unchanged. When nothing is found and
/// a `next` tier exists, the read is delegated to it.
pub struct RepositoryStage<R: Record> {
    reader: Arc<dyn RecordReader<R>>,
    next: Option<SharedProcessor<R>>,
}

impl<R: Record> RepositoryStage<R> {
    pub fn new(reader: Arc<dyn RecordReader<R>>) -> Self {
        Self { reader, next: None }
    }

    #[must_use]
    pub fn with_next(mut self, next: SharedProcessor<R>) -> Self {
        self.next = Some(next);
        self
    }
}

#[async_trait]
impl<R: Record> ReadProcessor<R> for RepositoryStage<R> {
    async fn read(&self, lookup: &Lookup, out: &mut R, expiry: Duration) -> StashResult<ReadOutcome> {
        match self.reader.find_one(lookup.predicate()).await? {
            Some(record) => {
                *out = record;
                Ok(ReadOutcome::Hit)
            }
            None => match &self.next {
                Some(next) => next.read(lookup, out, expiry).await,
                None => {
                    debug!(key = %lookup.key(), "No row found");
                    *out = R::default();
                    Ok(ReadOutcome::NoData)
                }
            },
        }
    }

    async fn write(&self, _lookup: &Lookup, _record: &R, _expiry: Duration) -> StashResult<()> {
        Err(StashError::Unsupported(
            "repository stage is read-only".to_string(),
        ))
    }
}
