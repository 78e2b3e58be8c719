//! Exec-log decorator for key-value stores.
//!
//! Every backend call is reported to an [`ExecLogFn`] with its duration, a
//! description of the command and the error it produced, if any.

use crate::metrics::CacheMetrics;
use crate::KeyValueStore;
use async_trait::async_trait;
use stash_core::StashResult;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One executed backend command.
#[derive(Debug, Clone)]
pub struct ExecRecord {
    /// Wall time spent in the backend call.
    pub elapsed: Duration,
    /// Command and arguments, e.g. `GET stash:cache:42`.
    pub command: String,
    /// Error message, if the call failed.
    pub error: Option<String>,
}

/// Callback invoked after every backend call.
pub type ExecLogFn = Arc<dyn Fn(&ExecRecord) + Send + Sync>;

/// Exec-log callback that emits `tracing` events.
#[must_use]
pub fn tracing_exec_log() -> ExecLogFn {
    Arc::new(|record: &ExecRecord| match &record.error {
        Some(error) => warn!(
            command = %record.command,
            elapsed_us = record.elapsed.as_micros(),
            error = %error,
            "key-value command failed"
        ),
        None => debug!(
            command = %record.command,
            elapsed_us = record.elapsed.as_micros(),
            "key-value command"
        ),
    })
}

/// Wraps a store and reports every call through an exec-log callback.
pub struct InstrumentedStore<S> {
    inner: S,
    log: ExecLogFn,
}

impl<S: KeyValueStore> InstrumentedStore<S> {
    /// Wrap `inner`, reporting to `log`.
    pub fn new(inner: S, log: ExecLogFn) -> Self {
        Self { inner, log }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn report<T>(&self, started: Instant, command: impl FnOnce() -> String, result: &StashResult<T>) {
        let elapsed = started.elapsed();
        CacheMetrics::backend_call(elapsed, result.is_ok());
        let record = ExecRecord {
            elapsed,
            command: command(),
            error: result.as_ref().err().map(ToString::to_string),
        };
        (self.log)(&record);
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for InstrumentedStore<S> {
    async fn get(&self, key: &str) -> StashResult<Option<String>> {
        let started = Instant::now();
        let result = self.inner.get(key).await;
        self.report(started, || format!("GET {key}"), &result);
        result
    }

    async fn get_many(&self, keys: &[String]) -> StashResult<Vec<Option<String>>> {
        let started = Instant::now();
        let result = self.inner.get_many(keys).await;
        self.report(started, || format!("MGET {}", keys.join(" ")), &result);
        result
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StashResult<()> {
        let started = Instant::now();
        let result = self.inner.set(key, value, ttl).await;
        self.report(
            started,
            || format!("SET {key} {value} PX {}", ttl.as_millis()),
            &result,
        );
        result
    }

    async fn set_many(&self, entries: &[(String, String)], ttl: Duration) -> StashResult<()> {
        let started = Instant::now();
        let result = self.inner.set_many(entries, ttl).await;
        self.report(
            started,
            || {
                let keys: Vec<&str> = entries.iter().map(|(key, _)| key.as_str()).collect();
                format!("SET* [{}] PX {}", keys.join(" "), ttl.as_millis())
            },
            &result,
        );
        result
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StashResult<bool> {
        let started = Instant::now();
        let result = self.inner.set_if_absent(key, value, ttl).await;
        self.report(
            started,
            || format!("SET {key} {value} NX PX {}", ttl.as_millis()),
            &result,
        );
        result
    }

    async fn delete(&self, keys: &[String]) -> StashResult<u64> {
        let started = Instant::now();
        let result = self.inner.delete(keys).await;
        self.report(started, || format!("DEL {}", keys.join(" ")), &result);
        result
    }
}
