//! # Stash Tutorial
//!
//! Walks through the read-through paths against the configured Redis and
//! MySQL:
//! - single-key read of an existing row, then the cached re-read
//! - single-key read of a missing row (negative entry)
//! - batched read of several rows
//! - the same lookup through a local → Redis → MySQL processor chain

use anyhow::Context;
use serde::{Deserialize, Serialize};
use stash_cache::{DistributedLock, Keyspace, MemoryStore, RecordCache, SharedStore};
use stash_config::ConfigLoader;
use stash_core::telemetry::{init_tracing, TelemetryConfig};
use stash_core::{IsEmpty, Key, Lookup, Predicate, Record};
use stash_repository::RecordReader;
use stash_service::{ChainBuilder, StashContext};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

const PERSON_COLUMNS: &[&str] = &["id", "name", "age"];

#[derive(Debug, Default, Clone, Serialize, Deserialize, sqlx::FromRow)]
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

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Tutorial failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let loader = ConfigLoader::from_default_location()?;
    let config = loader.get().await;
    init_tracing(&TelemetryConfig::from(&config.observability))?;

    info!("Starting Stash tutorial, version {}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.environment);

    let context = StashContext::connect(&config).await?;
    seed(&context).await.context("seeding the person table")?;

    let reader: Arc<dyn RecordReader<Person>> = context.mysql_reader("person", PERSON_COLUMNS)?;
    let expiry = Duration::from_secs(10);

    let one = context.one_reader("person", Arc::clone(&reader));
    for attempt in ["first", "second"] {
        let started = Instant::now();
        let person = one.read(&Lookup::by("id", 42_i64), expiry).await?;
        info!(attempt, elapsed_us = started.elapsed().as_micros(), ?person, "Read person 42");
    }

    let missing = one.read(&Lookup::by("id", 99_i64), expiry).await?;
    info!(empty = missing.is_empty(), "Read person 99");

    let multi = context.multi_reader("person", Arc::clone(&reader));
    let ids = vec![42_i64, 7, 8];
    let people = multi
        .read(&ids, &Predicate::in_list("id", ids.clone()), expiry)
        .await?;
    info!(count = people.len(), ?people, "Read batch");

    let local: SharedStore = Arc::new(MemoryStore::new());
    let chain = ChainBuilder::new()
        .with_policy(context.policy())
        .cache(
            RecordCache::new(Arc::clone(&local), Keyspace::new("local:person:")),
            DistributedLock::new(Arc::clone(&local), "local:lock:person:", context.lock_options()),
        )
        .cache(context.record_cache("chain:person:"), context.lock("chain:person"))
        .repository(reader)
        .build()?;

    let mut person = Person::default();
    let outcome = chain.read(&Lookup::by("id", 7_i64), &mut person, expiry).await?;
    info!(?outcome, ?person, "Read person 7 through the chain");

    context.database()?.close().await;
    info!("Tutorial complete");
    Ok(())
}

/// Creates the `person` table and the rows the walkthrough reads.
async fn seed(context: &StashContext) -> anyhow::Result<()> {
    let pool = context.database()?.inner();

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS person (
            id BIGINT PRIMARY KEY,
            name VARCHAR(64) NOT NULL,
            age INT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    for (id, name, age) in [(42_i64, "Zhang San", 3), (7, "Li Si", 30), (8, "Wang Wu", 41)] {
        sqlx::query("REPLACE INTO person (id, name, age) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(age)
            .execute(pool)
            .await?;
    }
    Ok(())
}
