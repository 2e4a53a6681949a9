//! Purge Task
//!
//! Background task that periodically evicts entries past their lifespan or
//! idle-age threshold, so memory is reclaimed even when no writes arrive.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that periodically purges the cache.
///
/// The task runs in an infinite loop, sleeping for `interval` between
/// passes. A pass only evicts; it never ages entries, so idle-age keeps
/// counting writes and policy changes rather than wall-clock ticks.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(CacheStore::<String, String>::default());
/// let purge_handle = spawn_purge_task(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// purge_handle.abort();
/// ```
pub fn spawn_purge_task<K, V>(cache: Arc<CacheStore<K, V>>, interval: Duration) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("Starting cache purge task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.purge();

            if removed > 0 {
                info!("Cache purge: removed {} entries", removed);
            } else {
                debug!("Cache purge: nothing to remove");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_purge_task_removes_expired_entries() {
        let cache: Arc<CacheStore<String, String>> =
            Arc::new(CacheStore::new(100, Duration::from_millis(100)).unwrap());
        cache.set("expire_soon".to_string(), "value".to_string());

        let handle = spawn_purge_task(cache.clone(), Duration::from_millis(50));

        // Wait for the entry to expire and a purge to run
        tokio::time::sleep(Duration::from_millis(300)).await;

        // Inspect without sweeping
        assert_eq!(cache.stats().total_entries, 0);
        assert!(cache.stats().evictions >= 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_purge_task_preserves_valid_entries() {
        let cache: Arc<CacheStore<String, String>> =
            Arc::new(CacheStore::with_capacity(1).unwrap());
        cache.set("long_lived".to_string(), "value".to_string());

        let handle = spawn_purge_task(cache.clone(), Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(150)).await;

        // Purges never age, so capacity 1 is not reached
        assert_eq!(cache.try_get("long_lived"), Some("value".to_string()));

        handle.abort();
    }

    #[tokio::test]
    async fn test_purge_task_can_be_aborted() {
        let cache: Arc<CacheStore<u32, u32>> = Arc::new(CacheStore::default());

        let handle = spawn_purge_task(cache, Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
