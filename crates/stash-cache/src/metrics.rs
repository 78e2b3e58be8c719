//! Metrics for cache-aside reads and the distributed lock.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Metric names.
pub mod names {
    /// Reads served from the cache.
    pub const CACHE_HITS_TOTAL: &str = "stash_cache_hits_total";
    /// Reads that found no cache entry.
    pub const CACHE_MISSES_TOTAL: &str = "stash_cache_misses_total";
    /// Cache reads that failed and fell through to the backing store.
    pub const CACHE_READ_ERRORS_TOTAL: &str = "stash_cache_read_errors_total";
    /// Backing-store reads.
    pub const BACKING_READS_TOTAL: &str = "stash_backing_reads_total";
    /// Cache write-backs that failed.
    pub const WRITE_BACK_FAILURES_TOTAL: &str = "stash_write_back_failures_total";
    /// Negative entries written.
    pub const NEGATIVE_WRITES_TOTAL: &str = "stash_negative_writes_total";

    /// Locks won.
    pub const LOCK_ACQUIRED_TOTAL: &str = "stash_lock_acquired_total";
    /// Lock attempts lost to another holder.
    pub const LOCK_CONTENDED_TOTAL: &str = "stash_lock_contended_total";
    /// Lock attempts that failed in the backend.
    pub const LOCK_ERRORS_TOTAL: &str = "stash_lock_errors_total";

    /// Key-value backend call duration in seconds.
    pub const BACKEND_CALL_DURATION: &str = "stash_backend_call_duration_seconds";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of reads served from the cache");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Total number of reads with no cache entry");
    describe_counter!(
        names::CACHE_READ_ERRORS_TOTAL,
        "Total number of failed cache reads that fell through to the backing store"
    );
    describe_counter!(names::BACKING_READS_TOTAL, "Total number of backing-store reads");
    describe_counter!(
        names::WRITE_BACK_FAILURES_TOTAL,
        "Total number of failed cache write-backs"
    );
    describe_counter!(names::NEGATIVE_WRITES_TOTAL, "Total number of negative entries written");

    describe_counter!(names::LOCK_ACQUIRED_TOTAL, "Total number of locks acquired");
    describe_counter!(
        names::LOCK_CONTENDED_TOTAL,
        "Total number of lock attempts lost to another holder"
    );
    describe_counter!(names::LOCK_ERRORS_TOTAL, "Total number of lock backend failures");

    describe_histogram!(
        names::BACKEND_CALL_DURATION,
        "Key-value backend call duration in seconds"
    );
}

/// Cache metrics recorder.
#[derive(Clone)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a cache hit.
    pub fn hit(path: &'static str) {
        counter!(names::CACHE_HITS_TOTAL, "path" => path).increment(1);
    }

    /// Record a cache miss.
    pub fn miss(path: &'static str) {
        counter!(names::CACHE_MISSES_TOTAL, "path" => path).increment(1);
    }

    /// Record a failed cache read.
    pub fn read_error(path: &'static str) {
        counter!(names::CACHE_READ_ERRORS_TOTAL, "path" => path).increment(1);
    }

    /// Record a backing-store read.
    pub fn backing_read(path: &'static str) {
        counter!(names::BACKING_READS_TOTAL, "path" => path).increment(1);
    }

    /// Record a failed write-back.
    pub fn write_back_failed(path: &'static str) {
        counter!(names::WRITE_BACK_FAILURES_TOTAL, "path" => path).increment(1);
    }

    /// Record a negative entry.
    pub fn negative_write(path: &'static str) {
        counter!(names::NEGATIVE_WRITES_TOTAL, "path" => path).increment(1);
    }

    /// Record a lock outcome.
    pub fn lock(acquired: bool) {
        if acquired {
            counter!(names::LOCK_ACQUIRED_TOTAL).increment(1);
        } else {
            counter!(names::LOCK_CONTENDED_TOTAL).increment(1);
        }
    }

    /// Record a lock backend failure.
    pub fn lock_error() {
        counter!(names::LOCK_ERRORS_TOTAL).increment(1);
    }

    /// Record a key-value backend call.
    pub fn backend_call(duration: Duration, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        histogram!(names::BACKEND_CALL_DURATION, "status" => status).record(duration.as_secs_f64());
    }
}
