//! Response bodies of the admin API.

use serde::Serialize;

use crate::metrics::MetricsSnapshot;

/// Response body for `GET /metrics`.
///
/// The snapshot fields keep their wire shape; the adapter figures describe
/// the in-memory backend the server runs with.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
    /// hits / (hits + misses), 0 before any lookup
    pub hit_rate: f64,
    /// Live entries currently held by the adapter
    pub entries: usize,
    pub evictions: u64,
}

impl MetricsResponse {
    pub fn new(snapshot: MetricsSnapshot, entries: usize, evictions: u64) -> Self {
        Self {
            hit_rate: snapshot.cache.hit_rate(),
            snapshot,
            entries,
            evictions,
        }
    }
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRecorder;
    use std::time::Duration;

    #[test]
    fn test_metrics_response_shape() {
        let recorder = MetricsRecorder::new();
        recorder.record_hit();
        recorder.record_hit();
        recorder.record_hit();
        recorder.record_miss();
        recorder.record_duration("getOne:users", Duration::from_millis(2));

        let resp = MetricsResponse::new(recorder.snapshot(), 7, 1);
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["cache"]["hits"], 3);
        assert_eq!(json["db"]["perOp"]["getOne:users"]["count"], 1);
        assert_eq!(json["hitRate"], 0.75);
        assert_eq!(json["entries"], 7);
        assert_eq!(json["evictions"], 1);
    }

    #[test]
    fn test_metrics_response_zero_lookups() {
        let resp = MetricsResponse::new(MetricsSnapshot::default(), 0, 0);
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
