//! Key-value backend contract.

use async_trait::async_trait;
use stash_core::StashResult;
use std::sync::Arc;
use std::time::Duration;

/// A shared, type-erased key-value backend.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// A key-value backend with per-entry expiry.
///
/// `Ok(None)` from a read means the key is absent. `Err` is reserved for
/// transport or backend failures so callers can tell the two apart.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads one key.
    async fn get(&self, key: &str) -> StashResult<Option<String>>;

    /// Reads many keys in one round trip. The result is positional.
    async fn get_many(&self, keys: &[String]) -> StashResult<Vec<Option<String>>>;

    /// Writes one key with an expiry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StashResult<()>;

    /// Writes every entry with the same expiry, all or nothing.
    async fn set_many(&self, entries: &[(String, String)], ttl: Duration) -> StashResult<()>;

    /// Writes the key only if it does not exist yet.
    ///
    /// Returns true if this call created the entry.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StashResult<bool>;

    /// Deletes keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> StashResult<u64>;
}
