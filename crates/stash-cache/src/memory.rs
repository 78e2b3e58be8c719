//! In-process key-value store.
//!
//! Usable as a first cache tier in front of Redis, or as a deterministic
//! backend in tests. Expiry is measured with `tokio::time::Instant`, so a
//! paused test clock controls it.

use crate::KeyValueStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use stash_core::StashResult;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Writes between two sweeps of expired entries.
const SWEEP_EVERY: u32 = 64;

struct Entry {
    value: String,
    /// `None` when the TTL is too large to represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: String, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: now.checked_add(ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, Entry>,
    writes: u32,
}

impl Entries {
    /// Counts a write and drops expired entries every [`SWEEP_EVERY`] writes.
    fn note_write(&mut self, now: Instant) {
        self.writes += 1;
        if self.writes >= SWEEP_EVERY {
            self.writes = 0;
            self.map.retain(|_, entry| entry.is_live(now));
        }
    }
}

/// Process-local key-value store with per-entry expiry.
///
/// Expired entries are dropped when read and swept periodically on write.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining lifetime of a live entry. An entry that never expires
    /// reports `Duration::MAX`.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .lock()
            .map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.expires_at.map_or(Duration::MAX, |at| at - now))
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().map.values().filter(|e| e.is_live(now)).count()
    }

    /// Whether the store holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.lock().map.clear();
    }

    /// Drops expired entries, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.map.len();
        entries.map.retain(|_, entry| entry.is_live(now));
        entries.writes = 0;
        before - entries.map.len()
    }

    fn read(&self, key: &str, now: Instant) -> Option<String> {
        let mut entries = self.entries.lock();
        match entries.map.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.map.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StashResult<Option<String>> {
        Ok(self.read(key, Instant::now()))
    }

    async fn get_many(&self, keys: &[String]) -> StashResult<Vec<Option<String>>> {
        let now = Instant::now();
        Ok(keys.iter().map(|key| self.read(key, now)).collect())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StashResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.note_write(now);
        entries
            .map
            .insert(key.to_string(), Entry::new(value.to_string(), now, ttl));
        Ok(())
    }

    async fn set_many(&self, items: &[(String, String)], ttl: Duration) -> StashResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.note_write(now);
        for (key, value) in items {
            entries.map.insert(key.clone(), Entry::new(value.clone(), now, ttl));
        }
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StashResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if entries.map.get(key).is_some_and(|entry| entry.is_live(now)) {
            return Ok(false);
        }
        entries.note_write(now);
        entries
            .map
            .insert(key.to_string(), Entry::new(value.to_string(), now, ttl));
        Ok(true)
    }

    async fn delete(&self, keys: &[String]) -> StashResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let deleted = keys
            .iter()
            .filter_map(|key| entries.map.remove(key))
            .filter(|entry| entry.is_live(now))
            .count();
        Ok(deleted as u64)
    }
}
