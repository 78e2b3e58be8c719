//! Cache-aside reader/writer for records.

use crate::{Keyspace, SharedStore};
use stash_core::codec;
use stash_core::{require_key, Record, StashResult, Traversable};
use std::time::Duration;
use tracing::warn;

/// Reads and writes records in one key namespace.
///
/// Entries are keyed by [`Keyspace::derive`] of the raw key and hold the
/// record's payload as produced by [`codec::encode`].
#[derive(Clone)]
pub struct RecordCache {
    store: SharedStore,
    keyspace: Keyspace,
}

impl RecordCache {
    pub fn new(store: SharedStore, keyspace: Keyspace) -> Self {
        Self { store, keyspace }
    }

    #[must_use]
    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// Reads one record. `Ok(None)` means the entry is absent.
    ///
    /// A payload that does not decode is an error, so the caller treats it
    /// like any other unusable cache read.
    pub async fn read<R: Record>(&self, raw_key: &str) -> StashResult<Option<R>> {
        let key = self.keyspace.derive(raw_key);
        match self.store.get(&key).await? {
            Some(payload) => codec::decode(&payload).map(Some),
            None => Ok(None),
        }
    }

    /// Reads many records in one call. The result is positional.
    ///
    /// Undecodable entries count as missing.
    pub async fn read_many<R: Record>(&self, raw_keys: &[String]) -> StashResult<Vec<Option<R>>> {
        let keys = self.keyspace.derive_all(raw_keys);
        let payloads = self.store.get_many(&keys).await?;

        let records = payloads
            .into_iter()
            .zip(&keys)
            .map(|(payload, key)| {
                payload.and_then(|payload| match codec::decode(&payload) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                        None
                    }
                })
            })
            .collect();
        Ok(records)
    }

    /// Writes a record under its own key.
    pub async fn write<R: Record>(&self, record: &R, ttl: Duration) -> StashResult<()> {
        let raw_key = require_key(record)?;
        self.write_as(&raw_key, record, ttl).await
    }

    /// Writes a record under an explicit raw key.
    pub async fn write_as<R: Record>(&self, raw_key: &str, record: &R, ttl: Duration) -> StashResult<()> {
        let payload = codec::encode(record)?;
        self.store.set(&self.keyspace.derive(raw_key), &payload, ttl).await
    }

    /// Writes every element of a collection as its own entry, in one call.
    ///
    /// Every element must expose a key; nothing is written otherwise.
    pub async fn write_all<C>(&self, collection: &C, ttl: Duration) -> StashResult<()>
    where
        C: Traversable + ?Sized,
        C::Item: Record,
    {
        let mut entries = Vec::new();
        collection.traverse(&mut |item| {
            let key = self.keyspace.derive(&require_key(item)?);
            entries.push((key, codec::encode(item)?));
            Ok(())
        })?;

        if entries.is_empty() {
            return Ok(());
        }
        self.store.set_many(&entries, ttl).await
    }

    /// Deletes entries, returning how many existed.
    pub async fn invalidate(&self, raw_keys: &[String]) -> StashResult<u64> {
        self.store.delete(&self.keyspace.derive_all(raw_keys)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KeyValueStore, MemoryStore};
    use serde::{Deserialize, Serialize};
    use stash_core::{Capability, Key, StashError};
    use std::sync::Arc;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Person {
        id: i64,
        name: String,
        age: i32,
    }

    impl Key for Person {
        fn key(&self) -> String {
            self.id.to_string()
        }
    }

    impl Record for Person {
        fn as_key(&self) -> Option<&dyn Key> {
            Some(self)
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Keyless {
        value: String,
    }

    impl Record for Keyless {}

    fn person(id: i64, name: &str) -> Person {
        Person {
            id,
            name: name.to_string(),
            age: 3,
        }
    }

    fn cache() -> (RecordCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = RecordCache::new(store.clone(), Keyspace::new("person:"));
        (cache, store)
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (cache, store) = cache();
        let zhang = person(42, "Zhang San");

        cache.write(&zhang, Duration::from_secs(10)).await.unwrap();

        assert!(store.get("person:42").await.unwrap().is_some());
        assert_eq!(cache.read::<Person>("42").await.unwrap(), Some(zhang));
        assert_eq!(cache.read::<Person>("43").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_requires_key() {
        let (cache, store) = cache();
        let err = cache
            .write(&Keyless::default(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, StashError::CapabilityMissing(Capability::Key)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_write_all_keys_each_element() {
        let (cache, store) = cache();
        let people = vec![person(1, "a"), person(2, "b"), person(3, "c")];

        cache.write_all(&people, Duration::from_secs(10)).await.unwrap();

        assert_eq!(store.len(), 3);
        let keys = vec!["3".to_string(), "9".to_string(), "1".to_string()];
        let read = cache.read_many::<Person>(&keys).await.unwrap();
        assert_eq!(read, vec![Some(person(3, "c")), None, Some(person(1, "a"))]);
    }

    #[tokio::test]
    async fn test_write_all_rejects_keyless_elements() {
        let (cache, store) = cache();
        let items = vec![Keyless::default()];

        assert!(cache.write_all(&items, Duration::from_secs(1)).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_read_many_skips_corrupt_entries() {
        let (cache, store) = cache();
        store.set("person:1", "{broken", Duration::from_secs(1)).await.unwrap();
        cache.write(&person(2, "b"), Duration::from_secs(1)).await.unwrap();

        let keys = vec!["1".to_string(), "2".to_string()];
        let read = cache.read_many::<Person>(&keys).await.unwrap();
        assert_eq!(read, vec![None, Some(person(2, "b"))]);

        assert!(cache.read::<Person>("1").await.is_err());
    }

    #[tokio::test]
    async fn test_invalidate() {
        let (cache, _store) = cache();
        cache.write(&person(42, "Zhang San"), Duration::from_secs(10)).await.unwrap();

        let deleted = cache.invalidate(&["42".to_string(), "7".to_string()]).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(cache.read::<Person>("42").await.unwrap(), None);
    }
}
