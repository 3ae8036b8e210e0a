//! Read-through cache orchestration.
//!
//! Looks an operation up in the adapter by a deterministic key, runs the
//! producer on a miss and stores the resulting envelope when the cache
//! predicate allows it. Concurrent misses on the same key are not
//! coalesced; each caller runs its own producer.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::CacheAdapter;
use crate::envelope::{normalize, Envelope, IntoEnvelope, Logger};
use crate::keys::{build_key, normalize_ttl, StableValue, Ttl};
use crate::metrics::MetricsRecorder;

/// Decides whether a freshly produced envelope may be stored.
pub type CachePredicate = Arc<dyn Fn(&Envelope) -> bool + Send + Sync>;

// == Cache Options ==
/// Per-call caching instructions.
#[derive(Clone)]
pub struct CacheOptions {
    /// When false the cache is not touched at all
    pub enabled: bool,
    /// Explicit key; derived from the operation and its arguments when unset
    pub key: Option<String>,
    /// Entry lifetime; normalized with the TTL rules (default 60000 ms)
    pub ttl: Option<Ttl>,
    cache_if: Option<CachePredicate>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            key: None,
            ttl: None,
            cache_if: None,
        }
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("enabled", &self.enabled)
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .field("cache_if", &self.cache_if.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}

impl CacheOptions {
    /// Enabled caching with default TTL and predicate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that bypass the cache entirely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_ttl(mut self, ttl: impl Into<Ttl>) -> Self {
        self.ttl = Some(ttl.into());
        self
    }

    /// Replaces the default "only successes" predicate.
    pub fn cache_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Envelope) -> bool + Send + Sync + 'static,
    {
        self.cache_if = Some(Arc::new(predicate));
        self
    }

    /// Whether `envelope` should be written to the adapter.
    pub fn should_cache(&self, envelope: &Envelope) -> bool {
        match &self.cache_if {
            Some(predicate) => predicate(envelope),
            None => envelope.status,
        }
    }

    /// TTL in milliseconds after normalization.
    pub fn ttl_ms(&self) -> u64 {
        normalize_ttl(self.ttl.as_ref())
    }

    /// Reads options from loosely-typed input.
    ///
    /// `true` and `{}` enable caching with defaults, `false` disables it,
    /// an object may carry `enabled`, `key` and `ttl`. Anything else yields
    /// `None` (no caching).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(true) => Some(Self::new()),
            Value::Bool(false) => Some(Self::disabled()),
            Value::Object(map) => {
                let mut options = Self::new();
                if let Some(enabled) = map.get("enabled").and_then(Value::as_bool) {
                    options.enabled = enabled;
                }
                options.key = map.get("key").and_then(Value::as_str).map(str::to_string);
                options.ttl = map
                    .get("ttl")
                    .and_then(|ttl| serde_json::from_value::<Ttl>(ttl.clone()).ok());
                Some(options)
            }
            _ => None,
        }
    }
}

// == Orchestrator ==
/// Borrowed view of the collaborators a cached call needs.
pub struct CacheOrchestrator<'a> {
    pub adapter: &'a dyn CacheAdapter,
    pub metrics: &'a MetricsRecorder,
    pub logger: &'a dyn Logger,
}

impl<'a> CacheOrchestrator<'a> {
    pub fn new(
        adapter: &'a dyn CacheAdapter,
        metrics: &'a MetricsRecorder,
        logger: &'a dyn Logger,
    ) -> Self {
        Self {
            adapter,
            metrics,
            logger,
        }
    }

    /// Runs `producer` through the cache.
    ///
    /// `args[0]` is the entity identifier used for key derivation. Without
    /// options, or with `enabled == false`, the producer runs uncached. A key
    /// that cannot be derived also bypasses the cache instead of failing.
    pub async fn run<F, Fut, R>(
        &self,
        op: &str,
        args: &[StableValue],
        options: Option<&CacheOptions>,
        producer: F,
    ) -> Envelope
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
        R: IntoEnvelope,
    {
        let options = match options {
            Some(options) if options.enabled => options,
            _ => return normalize(self.logger, producer().await, op),
        };

        let key = match &options.key {
            Some(key) => key.clone(),
            None => match build_key(op, args) {
                Ok(key) => key,
                Err(err) => {
                    debug!(op, error = %err, "cache key unavailable, running uncached");
                    return normalize(self.logger, producer().await, op);
                }
            },
        };

        match self.adapter.get(&key).await {
            Ok(Some(hit)) => {
                self.metrics.record_hit();
                debug!(key = %key, "cache hit");
                return hit;
            }
            Ok(None) => {}
            Err(err) => warn!(key = %key, error = %err, "cache lookup failed, treating as miss"),
        }

        self.metrics.record_miss();
        debug!(key = %key, "cache miss");

        let envelope = normalize(self.logger, producer().await, op);

        if options.should_cache(&envelope) {
            match self.adapter.put(&key, envelope.clone(), options.ttl_ms()).await {
                Ok(()) => self.metrics.record_put(),
                Err(err) => warn!(key = %key, error = %err, "cache store failed"),
            }
        }

        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryAdapter, NoopAdapter};
    use crate::envelope::NoopLogger;
    use crate::error::{MiddlewareError, Result};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn args(id: i64) -> Vec<StableValue> {
        vec!["users".into(), json!({ "id": id }).into()]
    }

    async fn counted(calls: &AtomicUsize, value: Value) -> Value {
        calls.fetch_add(1, Ordering::SeqCst);
        value
    }

    #[tokio::test]
    async fn test_second_call_is_hit() {
        let adapter = InMemoryAdapter::new(100);
        let metrics = MetricsRecorder::new();
        let cache = CacheOrchestrator::new(&adapter, &metrics, &NoopLogger);
        let calls = AtomicUsize::new(0);
        let options = CacheOptions::new();

        let first = cache
            .run("getOne", &args(1), Some(&options), || counted(&calls, json!({"id": 1})))
            .await;
        let second = cache
            .run("getOne", &args(1), Some(&options), || counted(&calls, json!({"id": 1})))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        let snap = metrics.snapshot();
        assert_eq!((snap.cache.hits, snap.cache.misses, snap.cache.puts), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_disabled_never_touches_cache() {
        let adapter = InMemoryAdapter::new(100);
        let metrics = MetricsRecorder::new();
        let cache = CacheOrchestrator::new(&adapter, &metrics, &NoopLogger);
        let calls = AtomicUsize::new(0);

        for options in [None, Some(CacheOptions::disabled())] {
            let env = cache
                .run("getOne", &args(1), options.as_ref(), || counted(&calls, json!(1)))
                .await;
            assert_eq!(env, Envelope::ok(json!(1)));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(adapter.is_empty());
        assert_eq!(metrics.snapshot().cache.misses, 0);
    }

    #[tokio::test]
    async fn test_explicit_key_wins() {
        let adapter = InMemoryAdapter::new(100);
        let metrics = MetricsRecorder::new();
        let cache = CacheOrchestrator::new(&adapter, &metrics, &NoopLogger);
        let options = CacheOptions::new().with_key("users:me");

        cache
            .run("getOne", &args(1), Some(&options), || async { json!("me") })
            .await;

        assert_eq!(adapter.keys().await.unwrap(), vec!["users:me".to_string()]);
    }

    #[tokio::test]
    async fn test_bad_key_bypasses_cache() {
        let adapter = InMemoryAdapter::new(100);
        let metrics = MetricsRecorder::new();
        let cache = CacheOrchestrator::new(&adapter, &metrics, &NoopLogger);
        let bad_args = vec![StableValue::Int(7)];

        let env = cache
            .run("getOne", &bad_args, Some(&CacheOptions::new()), || async { json!("ran") })
            .await;

        assert_eq!(env, Envelope::ok(json!("ran")));
        assert!(adapter.is_empty());
    }

    #[tokio::test]
    async fn test_failures_not_cached_by_default() {
        let adapter = InMemoryAdapter::new(100);
        let metrics = MetricsRecorder::new();
        let cache = CacheOrchestrator::new(&adapter, &metrics, &NoopLogger);

        let env = cache
            .run("getOne", &args(1), Some(&CacheOptions::new()), || async {
                Err::<Value, _>(MiddlewareError::Store("down".to_string()))
            })
            .await;

        assert!(!env.status);
        assert!(adapter.is_empty());
        assert_eq!(metrics.snapshot().cache.puts, 0);
    }

    #[tokio::test]
    async fn test_custom_predicate() {
        let adapter = InMemoryAdapter::new(100);
        let metrics = MetricsRecorder::new();
        let cache = CacheOrchestrator::new(&adapter, &metrics, &NoopLogger);
        let options = CacheOptions::new().cache_if(|env| env.data != json!(null));

        cache
            .run("getOne", &args(1), Some(&options), || async { json!(null) })
            .await;
        assert!(adapter.is_empty());

        cache
            .run("getOne", &args(2), Some(&options), || async { json!({"id": 2}) })
            .await;
        assert_eq!(adapter.len(), 1);
    }

    #[tokio::test]
    async fn test_noop_adapter_always_misses() {
        let metrics = MetricsRecorder::new();
        let cache = CacheOrchestrator::new(&NoopAdapter, &metrics, &NoopLogger);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .run("getOne", &args(1), Some(&CacheOptions::new()), || counted(&calls, json!(1)))
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(metrics.snapshot().cache.misses, 2);
    }

    struct BrokenAdapter;

    #[async_trait]
    impl CacheAdapter for BrokenAdapter {
        async fn get(&self, _key: &str) -> Result<Option<Envelope>> {
            Err(MiddlewareError::Cache("get refused".to_string()))
        }
        async fn put(&self, _key: &str, _value: Envelope, _ttl_ms: u64) -> Result<()> {
            Err(MiddlewareError::Cache("put refused".to_string()))
        }
        async fn del(&self, _key: &str) -> Result<()> {
            Ok(())
        }
        async fn keys(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_adapter_failures_degrade_to_uncached() {
        let metrics = MetricsRecorder::new();
        let cache = CacheOrchestrator::new(&BrokenAdapter, &metrics, &NoopLogger);

        let env = cache
            .run("getOne", &args(1), Some(&CacheOptions::new()), || async { json!("fresh") })
            .await;

        assert_eq!(env, Envelope::ok(json!("fresh")));
        assert_eq!(metrics.snapshot().cache.puts, 0);
    }

    #[test]
    fn test_options_from_value() {
        assert!(CacheOptions::from_value(&json!(true)).unwrap().enabled);
        assert!(!CacheOptions::from_value(&json!(false)).unwrap().enabled);
        assert!(CacheOptions::from_value(&json!(null)).is_none());

        let options =
            CacheOptions::from_value(&json!({"key": "k", "ttl": "1m"})).unwrap();
        assert!(options.enabled);
        assert_eq!(options.key.as_deref(), Some("k"));
        assert_eq!(options.ttl_ms(), 60_000);

        let options = CacheOptions::from_value(&json!({"enabled": false, "ttl": true})).unwrap();
        assert!(!options.enabled);
        assert_eq!(options.ttl_ms(), 60_000);
    }
}
