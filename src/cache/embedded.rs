//! Embedded Store Module
//!
//! In-process backend: a bounded LRU map for data and an unbounded map of lock records.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheEntry, LruMap, StoreBackend};
use crate::error::Result;

/// In-process store with strict LRU eviction and lazy TTL expiry.
///
/// Cloning is cheap and clones share state. The lock map has its own mutex
/// so the check-and-set in [`StoreBackend::try_lock`] is atomic across
/// concurrently racing callers. Lock records are never evicted; a record
/// only goes away when released, or once its TTL has elapsed.
#[derive(Debug, Clone)]
pub struct EmbeddedStore {
    data: Arc<Mutex<LruMap<Vec<u8>>>>,
    locks: Arc<Mutex<HashMap<String, CacheEntry<u64>>>>,
}

impl EmbeddedStore {
    /// Creates a store holding at most `capacity` data entries.
    pub fn new(capacity: usize) -> Self {
        debug!(capacity = capacity, "Embedded LRU store created");
        Self {
            data: Arc::new(Mutex::new(LruMap::new(capacity))),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of data entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }
}

impl StoreBackend for EmbeddedStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        if let Some(evicted) = self.data.lock().insert(key.to_string(), value, Some(ttl)) {
            debug!(evicted = %evicted, "LRU eviction");
        }
        Ok(())
    }

    async fn try_lock(&self, key: &str, token: u64, ttl: Duration) -> Result<bool> {
        let mut locks = self.locks.lock();
        if locks.get(key).is_some_and(|record| !record.is_expired()) {
            return Ok(false);
        }
        locks.insert(key.to_string(), CacheEntry::new(token, Some(ttl)));
        Ok(true)
    }

    async fn unlock(&self, key: &str, token: u64) -> Result<bool> {
        let mut locks = self.locks.lock();
        match locks.get(key) {
            Some(record) if record.value == token && !record.is_expired() => {
                locks.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn purge_expired(&self) -> usize {
        let data = self.data.lock().purge_expired();
        let locks = {
            let mut locks = self.locks.lock();
            let before = locks.len();
            let now = std::time::Instant::now();
            locks.retain(|_, record| !record.is_expired_at(now));
            before - locks.len()
        };
        data + locks
    }

    fn provider_name(&self) -> &'static str {
        "lru"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = EmbeddedStore::new(100);
        store
            .set("agencies", br#"[{"tag":"sf-muni"}]"#.to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        let value = store.get("agencies").await.unwrap();
        assert_eq!(value, Some(br#"[{"tag":"sf-muni"}]"#.to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_absent() {
        let store = EmbeddedStore::new(100);
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entry_absent_after_ttl() {
        let store = EmbeddedStore::new(100);
        store
            .set("a", b"1".to_vec(), Duration::from_millis(30))
            .await
            .unwrap();
        assert!(store.get("a").await.unwrap().is_some());
        sleep(Duration::from_millis(50)).await;
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recent() {
        let store = EmbeddedStore::new(2);
        let ttl = Duration::from_secs(60);
        store.set("a", b"1".to_vec(), ttl).await.unwrap();
        store.set("b", b"2".to_vec(), ttl).await.unwrap();
        store.get("a").await.unwrap();
        store.set("c", b"3".to_vec(), ttl).await.unwrap();
        assert!(store.get("a").await.unwrap().is_some());
        assert!(store.get("b").await.unwrap().is_none());
        assert!(store.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let store = EmbeddedStore::new(100);
        let ttl = Duration::from_secs(5);
        assert!(store.try_lock("a", 1, ttl).await.unwrap());
        assert!(!store.try_lock("a", 2, ttl).await.unwrap());
        // Data and lock namespaces are independent
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unlock_requires_matching_token() {
        let store = EmbeddedStore::new(100);
        let ttl = Duration::from_secs(5);
        store.try_lock("a", 1, ttl).await.unwrap();
        assert!(!store.unlock("a", 2).await.unwrap());
        assert!(!store.try_lock("a", 3, ttl).await.unwrap());
        assert!(store.unlock("a", 1).await.unwrap());
        assert!(store.try_lock("a", 3, ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_record_expires() {
        let store = EmbeddedStore::new(100);
        assert!(store.try_lock("a", 1, Duration::from_millis(20)).await.unwrap());
        sleep(Duration::from_millis(40)).await;
        assert!(store.try_lock("a", 2, Duration::from_secs(5)).await.unwrap());
        // The holder whose record expired cannot release the new one
        assert!(!store.unlock("a", 1).await.unwrap());
        assert!(store.unlock("a", 2).await.unwrap());
    }

    #[tokio::test]
    async fn test_held_locks_survive_beyond_capacity() {
        let store = EmbeddedStore::new(2);
        let ttl = Duration::from_secs(30);
        for (token, key) in ["a", "b", "c", "d"].into_iter().enumerate() {
            assert!(store.try_lock(key, token as u64, ttl).await.unwrap());
        }
        // Every record is still held, so none can be taken again
        for key in ["a", "b", "c", "d"] {
            assert!(!store.try_lock(key, 99, ttl).await.unwrap(), "{} was stolen", key);
        }
        assert!(store.unlock("a", 0).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = EmbeddedStore::new(100);
        store
            .set("short", b"1".to_vec(), Duration::from_millis(10))
            .await
            .unwrap();
        store
            .set("long", b"2".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        store.try_lock("short", 1, Duration::from_millis(10)).await.unwrap();
        sleep(Duration::from_millis(30)).await;
        assert_eq!(store.purge_expired(), 2);
        assert_eq!(store.len(), 1);
    }
}
