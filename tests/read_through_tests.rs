//! Read-through caching through the public context API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use store_cache::cache::CacheAdapter;
use store_cache::keys::{build_key, StableValue};
use store_cache::{CacheOptions, Envelope, InMemoryAdapter, Middleware};

fn users_args() -> Vec<StableValue> {
    vec!["users".into(), json!({ "id": 1 }).into()]
}

async fn read_user(middleware: &Middleware, options: &CacheOptions, calls: &AtomicUsize) -> Envelope {
    let args = users_args();
    middleware
        .with_cache("getOne", &args, Some(options), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            json!({ "id": 1, "name": "Ada" })
        })
        .await
}

#[tokio::test]
async fn test_hit_until_forced_expiry() {
    let middleware = Middleware::new();
    let adapter = Arc::new(InMemoryAdapter::new(100));
    middleware.configure_cache(Some(adapter.clone()));

    let calls = AtomicUsize::new(0);
    let options = CacheOptions::from_value(&json!({"enabled": true, "ttl": "1m"})).unwrap();
    let first = read_user(&middleware, &options, &calls).await;
    assert_eq!(first, Envelope::ok(json!({ "id": 1, "name": "Ada" })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let key = build_key("getOne", &users_args()).unwrap();
    assert!(key.starts_with("getOne:users:"));
    assert_eq!(adapter.get(&key).await.unwrap(), Some(first.clone()));

    let second = read_user(&middleware, &options, &calls).await;
    assert_eq!(second, first);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "second read is served from cache");

    assert!(adapter.expire(&key));
    let third = read_user(&middleware, &options, &calls).await;
    assert_eq!(third, first);
    assert_eq!(calls.load(Ordering::SeqCst), 2, "expired entry runs the producer again");

    let snapshot = middleware.metrics_snapshot();
    assert_eq!(snapshot.cache.hits, 1);
    assert_eq!(snapshot.cache.misses, 2);
    assert_eq!(snapshot.cache.puts, 2);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let middleware = Middleware::new();
    let adapter = Arc::new(InMemoryAdapter::new(100));
    middleware.configure_cache(Some(adapter.clone()));

    let args = users_args();
    let env = middleware
        .with_cache("getOne", &args, Some(&CacheOptions::new()), || async {
            Err::<serde_json::Value, _>(store_cache::MiddlewareError::Store(
                "connection reset".to_string(),
            ))
        })
        .await;

    assert!(!env.status);
    assert!(adapter.is_empty());
    assert_eq!(middleware.metrics_snapshot().cache.puts, 0);
}
