//! Expired Entry Sweep
//!
//! Background task that periodically drops expired entries held in process
//! memory. Entries are already treated as absent once expired; the sweep
//! only reclaims their memory.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Backend;

/// Spawns a background task that purges expired entries every
/// `cleanup_interval_secs` seconds.
///
/// Backends that expire entries on their own report nothing to purge.
/// The returned handle is aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let backend = Backend::Embedded(EmbeddedStore::new(1000));
/// let cleanup_handle = spawn_cleanup_task(backend.clone(), 1);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(backend: Backend, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            provider = backend.provider_name(),
            "Starting expired entry sweep with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = backend.purge_expired();
            if removed > 0 {
                info!("Expired entry sweep: removed {} entries", removed);
            } else {
                debug!("Expired entry sweep: nothing to remove");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EmbeddedStore;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let store = EmbeddedStore::new(100);
        let backend = Backend::Embedded(store.clone());
        backend
            .set("expire_soon", b"1".to_vec(), Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);

        let handle = spawn_cleanup_task(backend, 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(store.len(), 0, "Expired entry should have been swept");
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let backend = Backend::Embedded(EmbeddedStore::new(100));
        backend
            .set("long_lived", b"\"value\"".to_vec(), Duration::from_secs(3600))
            .await
            .unwrap();

        let handle = spawn_cleanup_task(backend.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(
            backend.get("long_lived").await.unwrap(),
            Some(b"\"value\"".to_vec())
        );
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(Backend::Embedded(EmbeddedStore::new(10)), 1);
        handle.abort();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
