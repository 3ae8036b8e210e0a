//! Metrics Module
//!
//! Process-wide cache counters and per-operation latency buckets.

mod recorder;

pub use recorder::{CacheCounters, DbMetrics, MetricsRecorder, MetricsSnapshot, OpTiming};
