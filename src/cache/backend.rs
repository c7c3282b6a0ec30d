//! Backend store contract and runtime backend selection.
//!
//! Uses enum dispatch so the embedded and shared stores can be chosen at
//! startup without boxing futures.

use std::future::Future;
use std::time::Duration;

use crate::cache::{EmbeddedStore, SharedStore};
use crate::config::{Config, Provider};
use crate::error::Result;

/// Operations every backend store provides.
///
/// `get` reports a missing or expired key as `Ok(None)`; transport failures
/// are `Err(CacheError::BackendUnavailable)`. Lock records live in a
/// namespace separate from data entries.
pub trait StoreBackend: Send + Sync {
    /// Reads the bytes stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Unconditionally stores `value` under `key` for `ttl`.
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Writes a lock record holding `token` only if no live record exists.
    ///
    /// Returns true when the record was written.
    fn try_lock(
        &self,
        key: &str,
        token: u64,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Deletes the lock record for `key` only if it still holds `token`.
    ///
    /// Returns true when a record was deleted.
    fn unlock(&self, key: &str, token: u64) -> impl Future<Output = Result<bool>> + Send;

    /// Drops expired entries held in process memory; returns how many.
    fn purge_expired(&self) -> usize;

    /// Short name used in logs and health reports.
    fn provider_name(&self) -> &'static str;
}

/// The backend selected at startup.
#[derive(Debug, Clone)]
pub enum Backend {
    /// In-process LRU store
    Embedded(EmbeddedStore),
    /// Network key/value store (boxed to reduce enum size)
    Shared(Box<SharedStore>),
}

impl Backend {
    /// Builds the backend named by the configuration.
    pub async fn from_config(config: &Config) -> Result<Self> {
        match &config.provider {
            Provider::Lru { capacity } => Ok(Self::Embedded(EmbeddedStore::new(*capacity))),
            Provider::Redis { url } => Ok(Self::Shared(Box::new(SharedStore::connect(url).await?))),
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Embedded(s) => s.get(key).await,
            Self::Shared(s) => s.get(key).await,
        }
    }

    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        match self {
            Self::Embedded(s) => s.set(key, value, ttl).await,
            Self::Shared(s) => s.set(key, value, ttl).await,
        }
    }

    pub async fn try_lock(&self, key: &str, token: u64, ttl: Duration) -> Result<bool> {
        match self {
            Self::Embedded(s) => s.try_lock(key, token, ttl).await,
            Self::Shared(s) => s.try_lock(key, token, ttl).await,
        }
    }

    pub async fn unlock(&self, key: &str, token: u64) -> Result<bool> {
        match self {
            Self::Embedded(s) => s.unlock(key, token).await,
            Self::Shared(s) => s.unlock(key, token).await,
        }
    }

    pub fn purge_expired(&self) -> usize {
        match self {
            Self::Embedded(s) => s.purge_expired(),
            Self::Shared(s) => s.purge_expired(),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::Embedded(s) => s.provider_name(),
            Self::Shared(s) => s.provider_name(),
        }
    }
}
