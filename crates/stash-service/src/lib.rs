//! # Stash Service
//!
//! Read-through orchestration on top of the cache and the backing store:
//!
//! ```text
//! caller
//!   ↓
//! OneCacheRepoReader / MultiCacheRepoReader / processor chain
//!   ↓ hit                     ↓ miss
//! RecordCache            DistributedLock → RecordReader → write-back → release
//! ```
//!
//! Cache and lock failures degrade to a backing-store read. Only
//! backing-store errors and missing record capabilities reach the caller.

pub mod context;
pub mod flow;
pub mod multi;
pub mod one;
pub mod processor;

pub use context::StashContext;
pub use flow::{run_flow, Flow, FlowControl, FlowHandler};
pub use multi::{partition, CacheStatus, MultiCacheRepoReader, Partition};
pub use one::OneCacheRepoReader;
pub use processor::{
    CacheStage, ChainBuilder, ReadOutcome, ReadProcessor, RepositoryStage, SharedProcessor,
};
