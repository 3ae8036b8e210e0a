//! Metrics Recorder Module
//!
//! Tracks cache hits, misses, puts and invalidations, plus per-operation
//! latency buckets keyed by `"<op>:<entity>"`.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

// == Cache Counters ==
/// Cache-side counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheCounters {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that fell through to the producer
    pub misses: u64,
    /// Envelopes written to the adapter
    pub puts: u64,
    /// Keys removed by the invalidation engine
    pub invalidations: u64,
}

impl CacheCounters {
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Operation Timing ==
/// Latency bucket for one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpTiming {
    pub count: u64,
    pub total_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl OpTiming {
    fn first(ms: f64) -> Self {
        Self {
            count: 1,
            total_ms: ms,
            min_ms: ms,
            max_ms: ms,
        }
    }

    fn add(&mut self, ms: f64) {
        self.count += 1;
        self.total_ms += ms;
        self.min_ms = self.min_ms.min(ms);
        self.max_ms = self.max_ms.max(ms);
    }

    /// Mean latency in milliseconds.
    pub fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }
}

/// Store-side timings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DbMetrics {
    #[serde(rename = "perOp")]
    pub per_op: BTreeMap<String, OpTiming>,
}

// == Snapshot ==
/// Point-in-time copy of all metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub cache: CacheCounters,
    pub db: DbMetrics,
}

// == Recorder ==
/// Mutex-guarded metrics state shared by every timed or cached path.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    state: Mutex<MetricsSnapshot>,
}

impl MetricsRecorder {
    /// Creates a recorder with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MetricsSnapshot> {
        // A panic mid-update leaves counters usable; keep recording.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_hit(&self) {
        self.lock().cache.hits += 1;
    }

    pub fn record_miss(&self) {
        self.lock().cache.misses += 1;
    }

    pub fn record_put(&self) {
        self.lock().cache.puts += 1;
    }

    pub fn record_invalidations(&self, count: u64) {
        self.lock().cache.invalidations += count;
    }

    // == Timing ==
    /// Records the wall time elapsed since `start` under `op`.
    pub fn record_timing(&self, op: &str, start: Instant) {
        self.record_duration(op, start.elapsed());
    }

    /// Records an already measured duration under `op`.
    pub fn record_duration(&self, op: &str, elapsed: Duration) {
        let ms = elapsed.as_nanos() as f64 / 1_000_000.0;
        let mut state = self.lock();
        match state.db.per_op.get_mut(op) {
            Some(bucket) => bucket.add(ms),
            None => {
                state.db.per_op.insert(op.to_string(), OpTiming::first(ms));
            }
        }
    }

    // == Snapshot ==
    /// Returns an independent deep copy of the current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.lock().clone()
    }

    // == Reset ==
    /// Zeroes every counter and drops all latency buckets.
    pub fn reset(&self) {
        *self.lock() = MetricsSnapshot::default();
    }
}
