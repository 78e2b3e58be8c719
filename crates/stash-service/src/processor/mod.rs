//! Composable read tiers.
//!
//! Each tier implements [`ReadProcessor`] and optionally delegates misses
//! to the next tier, so a chain such as memory → Redis → MySQL is built
//! from independent stages that only know the trait:
//!
//! ```text
//! CacheStage (MemoryStore)
//!   ↓ miss
//! CacheStage (RedisStore)
//!   ↓ miss
//! RepositoryStage (MySqlRecordReader)
//! ```

mod cache_stage;
mod chain;
mod repository_stage;

pub use cache_stage::CacheStage;
pub use chain::ChainBuilder;
pub use repository_stage::RepositoryStage;

use async_trait::async_trait;
use stash_core::{Lookup, Record, StashResult};
use std::sync::Arc;
use std::time::Duration;

/// Result of a tier read that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `out` holds the record.
    Hit,
    /// No tier had data. `out` is left as the default record.
    NoData,
}

impl ReadOutcome {
    #[must_use]
    pub const fn is_hit(self) -> bool {
        matches!(self, Self::Hit)
    }
}

/// One tier of a read chain.
#[async_trait]
pub trait ReadProcessor<R: Record>: Send + Sync {
    /// Reads the record for `lookup` into `out`.
    async fn read(&self, lookup: &Lookup, out: &mut R, expiry: Duration) -> StashResult<ReadOutcome>;

    /// Stores `record` in this tier under the lookup key.
    async fn write(&self, lookup: &Lookup, record: &R, expiry: Duration) -> StashResult<()>;
}

/// A shared, type-erased tier.
pub type SharedProcessor<R> = Arc<dyn ReadProcessor<R>>;
