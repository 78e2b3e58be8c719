//! Backing-store reader contract.

use async_trait::async_trait;
use stash_core::{Predicate, Record, StashResult};

/// Reads records from the system of record.
///
/// The predicate is built by the caller and interpreted only here.
#[async_trait]
pub trait RecordReader<R: Record>: Send + Sync {
    /// Finds the first record matching the predicate.
    async fn find_one(&self, predicate: &Predicate) -> StashResult<Option<R>>;

    /// Finds every record matching the predicate.
    async fn find_many(&self, predicate: &Predicate) -> StashResult<Vec<R>>;
}
