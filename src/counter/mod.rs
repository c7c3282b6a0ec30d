//! Counter Module
//!
//! Monotonically incrementing named counters with key enumeration, over the
//! same two backend families as the cache.

mod embedded;
mod shared;

use std::future::Future;

use futures::stream::BoxStream;

pub use embedded::EmbeddedCounter;
pub use shared::SharedCounter;

use crate::cache::Backend;
use crate::error::Result;

/// Lazily produced counter keys.
pub type KeyStream = BoxStream<'static, Result<String>>;

/// Operations every counter backend provides.
pub trait CounterStore: Send + Sync {
    /// Current value of `key`, or `None` if it was never incremented.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<u64>>> + Send;

    /// Adds one to `key`, creating it at 1 if absent.
    fn incr(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Enumerates every known key.
    ///
    /// Keys present when enumeration starts are always produced; keys added
    /// meanwhile may or may not be. Order is unspecified.
    fn keys(&self) -> impl Future<Output = Result<KeyStream>> + Send;
}

/// The counter backend selected at startup.
#[derive(Debug, Clone)]
pub enum Counters {
    Embedded(EmbeddedCounter),
    Shared(SharedCounter),
}

impl Counters {
    /// Builds counters of the same family as `backend`.
    ///
    /// Embedded counters are bounded by `capacity`; shared counters reuse the
    /// backend's connection.
    pub fn for_backend(backend: &Backend, capacity: usize) -> Self {
        match backend {
            Backend::Embedded(_) => Self::Embedded(EmbeddedCounter::new(capacity)),
            Backend::Shared(store) => Self::Shared(SharedCounter::new(store.connection())),
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<u64>> {
        match self {
            Self::Embedded(c) => c.get(key).await,
            Self::Shared(c) => c.get(key).await,
        }
    }

    pub async fn incr(&self, key: &str) -> Result<()> {
        match self {
            Self::Embedded(c) => c.incr(key).await,
            Self::Shared(c) => c.incr(key).await,
        }
    }

    pub async fn keys(&self) -> Result<KeyStream> {
        match self {
            Self::Embedded(c) => c.keys().await,
            Self::Shared(c) => c.keys().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EmbeddedStore;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_for_embedded_backend() {
        let backend = Backend::Embedded(EmbeddedStore::new(8));
        let counters = Counters::for_backend(&backend, 8);
        assert!(matches!(counters, Counters::Embedded(_)));

        counters.incr("hits:/api/agencies").await.unwrap();
        assert_eq!(counters.get("hits:/api/agencies").await.unwrap(), Some(1));
        let keys: Vec<String> = counters.keys().await.unwrap().try_collect().await.unwrap();
        assert_eq!(keys, vec!["hits:/api/agencies".to_string()]);
    }
}
