//! Cached-fetch orchestration: lock, check, fetch on miss, populate, release.

use std::future::Future;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{codec, Cache, LockGuard};
use crate::error::{CacheError, Result};

impl Cache {
    /// Returns the value cached under `key`, calling `fetch` on a miss.
    ///
    /// Concurrent callers for the same key serialize on the key's lock, so a
    /// miss triggers a single upstream call and later callers read the
    /// populated entry. Upstream errors propagate unchanged and leave the
    /// cache untouched. A failed write-through is logged and does not affect
    /// the returned value. The lock is released on every path; if this
    /// future is dropped mid-flight the release is deferred to the runtime.
    pub async fn fetch_through<T, E, F, Fut>(&self, key: &str, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        E: Into<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let guard = LockGuard::acquire(self.backend(), key, self.lock_settings()).await?;
        let outcome = self.load_or_fetch(key, fetch).await;
        if let Err(e) = guard.release().await {
            warn!(key = %key, error = %e, "Lock release failed; it will expire on its own");
        }
        outcome
    }

    async fn load_or_fetch<T, E, F, Fut>(&self, key: &str, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        E: Into<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(value) = self.get(key).await? {
            debug!(key = %key, "Cache HIT");
            return Ok(value);
        }

        info!(key = %key, "Cache MISS, fetching from upstream");
        let value = fetch().await.map_err(Into::into)?;

        match codec::encode(&value) {
            Ok(bytes) => {
                if let Err(e) = self.backend().set(key, bytes, self.ttl_data).await {
                    warn!(key = %key, error = %e, "Write-through failed; serving fetched value");
                }
            }
            Err(CacheError::AbsentValue) => {
                debug!(key = %key, "Upstream returned no value; nothing cached");
            }
            Err(e) => warn!(key = %key, error = %e, "Fetched value not cacheable"),
        }

        Ok(value)
    }
}
