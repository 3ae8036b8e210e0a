//! In-Memory Adapter Module
//!
//! HashMap-backed cache adapter with per-entry TTL and LRU eviction.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{CacheAdapter, CacheEntry};
use crate::envelope::Envelope;
use crate::error::Result;

// == Memory State ==
/// Recency is indexed by a monotonically increasing tick: `order` maps
/// tick to key and `ticks` maps key to its current tick, so touching,
/// forgetting and evicting are all O(log n).
#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, CacheEntry>,
    /// Lowest tick = least recently used
    order: BTreeMap<u64, String>,
    ticks: HashMap<String, u64>,
    next_tick: u64,
    evictions: u64,
}

impl MemoryState {
    fn touch(&mut self, key: &str) {
        self.forget(key);
        let tick = self.next_tick;
        self.next_tick += 1;
        self.order.insert(tick, key.to_string());
        self.ticks.insert(key.to_string(), tick);
    }

    fn forget(&mut self, key: &str) {
        if let Some(tick) = self.ticks.remove(key) {
            self.order.remove(&tick);
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        self.forget(key);
        self.entries.remove(key).is_some()
    }

    fn evict_oldest(&mut self) {
        if let Some((_, oldest)) = self.order.pop_first() {
            self.ticks.remove(&oldest);
            self.entries.remove(&oldest);
            self.evictions += 1;
        }
    }
}

// == In-Memory Adapter ==
/// Bounded in-process cache backend.
#[derive(Debug)]
pub struct InMemoryAdapter {
    state: Mutex<MemoryState>,
    max_entries: usize,
}

impl InMemoryAdapter {
    // == Constructor ==
    /// Creates an adapter holding at most `max_entries` envelopes.
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            max_entries: max_entries.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and returns how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let mut state = self.lock();
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.remove(key);
        }
        expired.len()
    }

    // == Force Expiry ==
    /// Expires `key` immediately. Returns false if the key is not stored.
    pub fn expire(&self, key: &str) -> bool {
        match self.lock().entries.get_mut(key) {
            Some(entry) => {
                entry.expire();
                true
            }
            None => false,
        }
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Entries dropped to make room for new ones.
    pub fn evictions(&self) -> u64 {
        self.lock().evictions
    }
}

impl Default for InMemoryAdapter {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl CacheAdapter for InMemoryAdapter {
    async fn get(&self, key: &str) -> Result<Option<Envelope>> {
        let mut state = self.lock();
        let expired = match state.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return Ok(None),
        };

        if expired {
            state.remove(key);
            return Ok(None);
        }

        state.touch(key);
        Ok(state.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn put(&self, key: &str, value: Envelope, ttl_ms: u64) -> Result<()> {
        let mut state = self.lock();

        if !state.entries.contains_key(key) && state.entries.len() >= self.max_entries {
            state.evict_oldest();
        }

        state
            .entries
            .insert(key.to_string(), CacheEntry::new(value, ttl_ms));
        state.touch(key);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .lock()
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn env(n: i64) -> Envelope {
        Envelope::ok(json!(n))
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let adapter = InMemoryAdapter::new(10);
        adapter.put("k1", env(1), 60_000).await.unwrap();

        assert_eq!(adapter.get("k1").await.unwrap(), Some(env(1)));
        assert_eq!(adapter.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let adapter = InMemoryAdapter::new(10);
        assert!(adapter.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let adapter = InMemoryAdapter::new(10);
        adapter.put("k1", env(1), 60_000).await.unwrap();
        adapter.put("k1", env(2), 60_000).await.unwrap();

        assert_eq!(adapter.get("k1").await.unwrap(), Some(env(2)));
        assert_eq!(adapter.len(), 1);
    }

    #[tokio::test]
    async fn test_del_is_idempotent() {
        let adapter = InMemoryAdapter::new(10);
        adapter.put("k1", env(1), 60_000).await.unwrap();
        adapter.del("k1").await.unwrap();
        adapter.del("k1").await.unwrap();

        assert!(adapter.is_empty());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let adapter = InMemoryAdapter::new(10);
        adapter.put("short", env(1), 50).await.unwrap();
        assert!(adapter.get("short").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(adapter.get("short").await.unwrap().is_none());
        assert!(adapter.is_empty(), "expired entry is dropped on read");
    }

    #[tokio::test]
    async fn test_force_expire() {
        let adapter = InMemoryAdapter::new(10);
        adapter.put("k1", env(1), 60_000).await.unwrap();

        assert!(adapter.expire("k1"));
        assert!(!adapter.expire("unknown"));
        assert!(adapter.get("k1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let adapter = InMemoryAdapter::new(3);
        adapter.put("k1", env(1), 0).await.unwrap();
        adapter.put("k2", env(2), 0).await.unwrap();
        adapter.put("k3", env(3), 0).await.unwrap();

        // Reading k1 makes k2 the least recently used
        adapter.get("k1").await.unwrap();
        adapter.put("k4", env(4), 0).await.unwrap();

        assert_eq!(adapter.len(), 3);
        assert_eq!(adapter.evictions(), 1);
        assert!(adapter.get("k2").await.unwrap().is_none());
        assert!(adapter.get("k1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_eviction_follows_read_order() {
        let adapter = InMemoryAdapter::new(3);
        for key in ["a", "b", "c"] {
            adapter.put(key, env(0), 0).await.unwrap();
        }
        // Oldest to newest: b, a, c
        adapter.get("a").await.unwrap();
        adapter.get("c").await.unwrap();
        adapter.get("a").await.unwrap();
        adapter.get("c").await.unwrap();

        adapter.put("d", env(4), 0).await.unwrap();
        assert!(adapter.get("b").await.unwrap().is_none());

        adapter.put("e", env(5), 0).await.unwrap();
        assert!(adapter.get("a").await.unwrap().is_none());
        assert_eq!(adapter.evictions(), 2);

        let mut keys = adapter.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_removed_key_is_not_evicted_later() {
        let adapter = InMemoryAdapter::new(2);
        adapter.put("a", env(1), 0).await.unwrap();
        adapter.put("b", env(2), 0).await.unwrap();
        adapter.del("a").await.unwrap();

        adapter.put("c", env(3), 0).await.unwrap();
        assert_eq!(adapter.evictions(), 0);
        assert_eq!(adapter.len(), 2);
    }

    #[tokio::test]
    async fn test_keys_skip_expired() {
        let adapter = InMemoryAdapter::new(10);
        adapter.put("live", env(1), 60_000).await.unwrap();
        adapter.put("dead", env(2), 60_000).await.unwrap();
        adapter.expire("dead");

        assert_eq!(adapter.keys().await.unwrap(), vec!["live".to_string()]);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let adapter = InMemoryAdapter::new(10);
        adapter.put("a", env(1), 60_000).await.unwrap();
        adapter.put("b", env(2), 60_000).await.unwrap();
        adapter.expire("a");

        assert_eq!(adapter.cleanup_expired(), 1);
        assert_eq!(adapter.len(), 1);
    }
}
