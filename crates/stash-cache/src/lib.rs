//! # Stash Cache
//!
//! Key-value storage for Stash: the [`KeyValueStore`] contract with Redis
//! and in-process implementations, the cache-aside [`RecordCache`], and the
//! advisory [`DistributedLock`] that serializes backing-store fallbacks.

pub mod instrumented;
pub mod keyspace;
pub mod lock;
pub mod memory;
pub mod metrics;
pub mod policy;
pub mod record_cache;
pub mod redis_store;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use instrumented::{tracing_exec_log, ExecLogFn, ExecRecord, InstrumentedStore};
pub use keyspace::{KeyFn, Keyspace};
pub use lock::{DistributedLock, LockOptions};
pub use memory::MemoryStore;
pub use policy::CachePolicy;
pub use record_cache::RecordCache;
pub use redis_store::{create_pool, RedisStore};
pub use store::{KeyValueStore, SharedStore};
