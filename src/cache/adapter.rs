//! Cache adapter capability set.

use async_trait::async_trait;

use crate::envelope::Envelope;
use crate::error::Result;

// == Cache Adapter ==
/// Backend the orchestrator and invalidation engine talk to.
///
/// Implementations may be purely synchronous (never awaiting inside) or
/// backed by network I/O; callers treat both the same. Implementations own
/// their internal synchronization.
#[async_trait]
pub trait CacheAdapter: Send + Sync {
    /// Returns the stored envelope, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Envelope>>;

    /// Stores `value` under `key` for `ttl_ms` milliseconds.
    async fn put(&self, key: &str, value: Envelope, ttl_ms: u64) -> Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn del(&self, key: &str) -> Result<()>;

    /// Enumerates every live key.
    async fn keys(&self) -> Result<Vec<String>>;
}

// == No-op Adapter ==
/// Stands in when no adapter is configured: never hits, stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAdapter;

#[async_trait]
impl CacheAdapter for NoopAdapter {
    async fn get(&self, _key: &str) -> Result<Option<Envelope>> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: Envelope, _ttl_ms: u64) -> Result<()> {
        Ok(())
    }

    async fn del(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
