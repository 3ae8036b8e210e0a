//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired entries out of the
//! in-memory adapter. Reads already skip expired entries; the sweep only
//! reclaims their memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::InMemoryAdapter;

/// Spawns the sweeper. Abort the returned handle to stop it.
pub fn spawn_cleanup_task(adapter: Arc<InMemoryAdapter>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = adapter.cleanup_expired();
            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheAdapter;
    use crate::envelope::Envelope;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_removes_expired_entries() {
        let adapter = Arc::new(InMemoryAdapter::new(100));
        adapter.put("expire_soon", Envelope::ok(json!(1)), 60_000).await.unwrap();
        adapter.put("long_lived", Envelope::ok(json!(2)), 0).await.unwrap();
        assert!(adapter.expire("expire_soon"));

        let handle = spawn_cleanup_task(adapter.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(adapter.keys().await.unwrap(), vec!["long_lived".to_string()]);
        assert_eq!(adapter.len(), 1, "expired entry should have been swept");

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_preserves_valid_entries() {
        let adapter = Arc::new(InMemoryAdapter::new(100));
        adapter.put("long_lived", Envelope::ok(json!("value")), 3_600_000).await.unwrap();

        let handle = spawn_cleanup_task(adapter.clone(), 1);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        let hit = adapter.get("long_lived").await.unwrap();
        assert_eq!(hit, Some(Envelope::ok(json!("value"))));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(Arc::new(InMemoryAdapter::new(10)), 1);

        handle.abort();

        let result = handle.await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
