//! Cache Module
//!
//! The cache facade consumed by data-access code: typed `get`/`set` over a
//! pluggable backend store, per-key locking, and the cached-fetch pattern.

mod backend;
pub mod codec;
mod embedded;
mod entry;
mod fetch;
pub mod lock;
mod lru;
mod shared;


use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

// Re-export public types
pub use backend::{Backend, StoreBackend};
pub use embedded::EmbeddedStore;
pub use entry::CacheEntry;
pub use lock::{LockGuard, LockSettings};
pub use lru::{LruMap, LruTracker};
pub use shared::SharedStore;

use crate::config::Config;
use crate::error::{CacheError, Result};

// == Cache ==
/// Typed cache facade over the active backend.
///
/// Cloning is cheap; clones share the same backend.
#[derive(Debug, Clone)]
pub struct Cache {
    backend: Backend,
    ttl_data: Duration,
    lock_settings: LockSettings,
}

impl Cache {
    /// Creates a cache whose entries live for `ttl_data` and whose lock
    /// records live for `ttl_lock`.
    pub fn new(backend: Backend, ttl_data: Duration, ttl_lock: Duration) -> Self {
        Self {
            backend,
            ttl_data,
            lock_settings: LockSettings::from_ttls(ttl_data, ttl_lock),
        }
    }

    /// Connects the configured backend and wraps it.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let backend = Backend::from_config(config).await?;
        Ok(Self::new(backend, config.ttl_data, config.ttl_lock))
    }

    /// Replaces the derived lock timing.
    pub fn with_lock_settings(mut self, lock_settings: LockSettings) -> Self {
        self.lock_settings = lock_settings;
        self
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn lock_settings(&self) -> &LockSettings {
        &self.lock_settings
    }

    // == Get ==
    /// Returns the value stored under `key`, or `None` when absent or expired.
    ///
    /// Stored bytes that do not decode as `T` are a
    /// [`CacheError::Serialization`] error.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.backend.get(key).await? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // == Set ==
    /// Stores `value` under `key` for the data TTL.
    ///
    /// # Panics
    /// If `value` is absent (serializes to `null`); storing nothing is a
    /// caller bug, not a runtime condition.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = match codec::encode(value) {
            Err(CacheError::AbsentValue) => panic!("value shouldn't be absent (key: {})", key),
            other => other?,
        };
        self.backend.set(key, bytes, self.ttl_data).await?;
        debug!(key = %key, "Cache SET");
        Ok(())
    }

    // == Lock ==
    /// Acquires the lock for `key`, returning its ownership token.
    pub async fn lock(&self, key: &str) -> Result<u64> {
        lock::acquire(&self.backend, key, &self.lock_settings).await
    }

    /// Releases the lock for `key` if `token` still owns it.
    pub async fn unlock(&self, key: &str, token: u64) -> Result<()> {
        lock::release(&self.backend, key, token).await
    }
}
