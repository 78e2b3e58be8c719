//! Shared fixtures for read-through integration tests.
//!
//! The backing store is an in-memory table that counts its reads, so tests
//! can assert how often a miss reached it.

#![allow(dead_code)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stash_cache::{DistributedLock, Keyspace, LockOptions, MemoryStore, RecordCache, SharedStore};
use stash_core::{IsEmpty, Key, Predicate, Record, SqlValue, StashError, StashResult};
use stash_repository::RecordReader;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub age: i32,
}

impl Person {
    pub fn new(id: i64, name: &str, age: i32) -> Self {
        Self {
            id,
            name: name.to_string(),
            age,
        }
    }
}

impl Key for Person {
    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl IsEmpty for Person {
    fn is_empty(&self) -> bool {
        self.id == 0
    }
}

impl Record for Person {
    fn as_key(&self) -> Option<&dyn Key> {
        Some(self)
    }

    fn as_is_empty(&self) -> Option<&dyn IsEmpty> {
        Some(self)
    }
}

/// A record type without any capability.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opaque {
    pub id: i64,
}

impl Record for Opaque {}

/// In-memory `person` table keyed by id.
#[derive(Default)]
pub struct PersonTable {
    rows: BTreeMap<i64, Person>,
    reads: AtomicUsize,
    delay: Duration,
    fail: bool,
}

impl PersonTable {
    pub fn with_rows(rows: impl IntoIterator<Item = Person>) -> Self {
        Self {
            rows: rows.into_iter().map(|p| (p.id, p)).collect(),
            ..Default::default()
        }
    }

    /// Every read sleeps for `delay` first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every read fails with a database error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    async fn select(&self, predicate: &Predicate) -> StashResult<Vec<Person>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(StashError::Database("connection reset".to_string()));
        }
        Ok(self
            .rows
            .values()
            .filter(|person| matches(predicate, person))
            .cloned()
            .collect())
    }
}

fn id_of(value: &SqlValue) -> Option<i64> {
    match value {
        SqlValue::Int(v) => Some(*v),
        SqlValue::Text(v) => v.parse().ok(),
        _ => None,
    }
}

/// Evaluates the id predicates used by the tests.
fn matches(predicate: &Predicate, person: &Person) -> bool {
    match predicate {
        Predicate::All => true,
        Predicate::Compare { column, value, .. } if column == "id" => id_of(value) == Some(person.id),
        Predicate::In { column, values } if column == "id" => {
            values.iter().any(|v| id_of(v) == Some(person.id))
        }
        Predicate::And(parts) => parts.iter().all(|p| matches(p, person)),
        Predicate::Or(parts) => parts.iter().any(|p| matches(p, person)),
        _ => false,
    }
}

#[async_trait]
impl RecordReader<Person> for PersonTable {
    async fn find_one(&self, predicate: &Predicate) -> StashResult<Option<Person>> {
        Ok(self.select(predicate).await?.into_iter().next())
    }

    async fn find_many(&self, predicate: &Predicate) -> StashResult<Vec<Person>> {
        self.select(predicate).await
    }
}

#[async_trait]
impl RecordReader<Opaque> for PersonTable {
    async fn find_one(&self, predicate: &Predicate) -> StashResult<Option<Opaque>> {
        let found = self.select(predicate).await?.into_iter().next();
        Ok(found.map(|p| Opaque { id: p.id }))
    }

    async fn find_many(&self, predicate: &Predicate) -> StashResult<Vec<Opaque>> {
        let found = self.select(predicate).await?;
        Ok(found.into_iter().map(|p| Opaque { id: p.id }).collect())
    }
}

pub fn zhang_san() -> Person {
    Person::new(42, "Zhang San", 3)
}

pub fn person_table() -> PersonTable {
    PersonTable::with_rows([zhang_san(), Person::new(7, "Li Si", 30), Person::new(8, "Wang Wu", 41)])
}

pub fn person_cache(store: SharedStore) -> RecordCache {
    RecordCache::new(store, Keyspace::new("stash:cache:person:"))
}

pub fn person_lock(store: SharedStore, options: LockOptions) -> DistributedLock {
    DistributedLock::new(store, "stash:lock:person:", options)
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}
