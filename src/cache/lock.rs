//! Distributed Lock Module
//!
//! Per-key mutual exclusion on top of whichever backend is active. Acquisition
//! is a bounded poll loop; every lock record carries its own TTL so a crashed
//! holder's lock expires on its own.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cache::Backend;
use crate::error::{CacheError, Result};

/// Lower bound on the poll interval so short lock TTLs never spin.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

// == Lock Settings ==
/// Timing parameters for lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// Lifetime of a lock record
    pub ttl: Duration,
    /// Give up acquiring after this long
    pub timeout: Duration,
    /// Pause between acquisition attempts
    pub poll_interval: Duration,
}

impl LockSettings {
    /// Derives the settings from the data and lock TTLs.
    ///
    /// Acquisition gives up after a tenth of the data TTL and polls every
    /// tenth of the lock TTL.
    pub fn from_ttls(ttl_data: Duration, ttl_lock: Duration) -> Self {
        Self {
            ttl: ttl_lock,
            timeout: ttl_data / 10,
            poll_interval: (ttl_lock / 10).max(MIN_POLL_INTERVAL),
        }
    }

    /// Overrides the acquisition timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }
}

// == Acquire ==
/// Acquires the lock for `key`, returning the ownership token.
///
/// Fails with [`CacheError::LockTimeout`] once `settings.timeout` has elapsed
/// without a successful conditional write.
pub async fn acquire(backend: &Backend, key: &str, settings: &LockSettings) -> Result<u64> {
    let token: u64 = rand::random();
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        if backend.try_lock(key, token, settings.ttl).await? {
            debug!(key = %key, attempts = attempts, "Lock acquired");
            return Ok(token);
        }

        let waited = started.elapsed();
        if waited >= settings.timeout {
            warn!(
                key = %key,
                attempts = attempts,
                waited_ms = waited.as_millis() as u64,
                "Lock acquisition timed out"
            );
            return Err(CacheError::LockTimeout(key.to_string()));
        }

        let remaining = settings.timeout - waited;
        tokio::time::sleep(settings.poll_interval.min(remaining)).await;
    }
}

// == Release ==
/// Releases the lock for `key` if it is still held with `token`.
///
/// A release after the record expired or was taken over is a no-op.
pub async fn release(backend: &Backend, key: &str, token: u64) -> Result<()> {
    if backend.unlock(key, token).await? {
        debug!(key = %key, "Lock released");
    } else {
        debug!(key = %key, "Lock no longer held by this token; release skipped");
    }
    Ok(())
}

// == Lock Guard ==
/// A held lock that is released when dropped.
///
/// Prefer [`LockGuard::release`]; dropping an unreleased guard (panic or
/// cancelled future) spawns the release on the current Tokio runtime, and
/// the record's TTL covers the case where no runtime is available.
#[derive(Debug)]
pub struct LockGuard {
    backend: Backend,
    key: String,
    token: u64,
    armed: bool,
}

impl LockGuard {
    /// Acquires the lock for `key` and wraps it in a guard.
    pub async fn acquire(backend: &Backend, key: &str, settings: &LockSettings) -> Result<Self> {
        let token = acquire(backend, key, settings).await?;
        Ok(Self {
            backend: backend.clone(),
            key: key.to_string(),
            token,
            armed: true,
        })
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    /// Releases the lock now.
    pub async fn release(mut self) -> Result<()> {
        self.armed = false;
        release(&self.backend, &self.key, self.token).await
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let backend = self.backend.clone();
        let key = std::mem::take(&mut self.key);
        let token = self.token;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = release(&backend, &key, token).await {
                        warn!(key = %key, error = %e, "Deferred lock release failed");
                    }
                });
            }
            Err(_) => warn!(key = %key, "No runtime to release lock; leaving it to expire"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EmbeddedStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn embedded() -> Backend {
        Backend::Embedded(EmbeddedStore::new(100))
    }

    fn settings(timeout_ms: u64) -> LockSettings {
        LockSettings::from_ttls(Duration::from_secs(10), Duration::from_secs(5))
            .with_timeout(Duration::from_millis(timeout_ms))
            .with_poll_interval(Duration::from_millis(5))
    }

    #[test]
    fn test_settings_from_ttls() {
        let s = LockSettings::from_ttls(Duration::from_secs(300), Duration::from_secs(10));
        assert_eq!(s.ttl, Duration::from_secs(10));
        assert_eq!(s.timeout, Duration::from_secs(30));
        assert_eq!(s.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_settings_poll_interval_floor() {
        let s = LockSettings::from_ttls(Duration::from_millis(5), Duration::from_nanos(5));
        assert_eq!(s.poll_interval, MIN_POLL_INTERVAL);
    }

    #[tokio::test]
    async fn test_second_acquire_times_out_until_release() {
        let backend = embedded();
        let first = acquire(&backend, "a", &settings(100)).await.unwrap();

        let started = Instant::now();
        let second = acquire(&backend, "a", &settings(100)).await;
        assert!(matches!(second, Err(CacheError::LockTimeout(ref k)) if k == "a"));
        assert!(started.elapsed() >= Duration::from_millis(100));

        release(&backend, "a", first).await.unwrap();
        assert!(acquire(&backend, "a", &settings(100)).await.is_ok());
    }

    #[tokio::test]
    async fn test_waiter_acquires_after_release() {
        let backend = embedded();
        let token = acquire(&backend, "a", &settings(1000)).await.unwrap();

        let waiter = {
            let backend = backend.clone();
            tokio::spawn(async move { acquire(&backend, "a", &settings(1000)).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        release(&backend, "a", token).await.unwrap();

        let second = waiter.await.unwrap().unwrap();
        assert_ne!(second, token);
    }

    #[tokio::test]
    async fn test_stale_release_is_noop() {
        let backend = embedded();
        let short = LockSettings {
            ttl: Duration::from_millis(20),
            ..settings(100)
        };
        let token_a = acquire(&backend, "a", &short).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        let token_b = acquire(&backend, "a", &settings(100)).await.unwrap();
        release(&backend, "a", token_a).await.unwrap();

        // token_b still holds the lock
        assert!(acquire(&backend, "a", &settings(30)).await.is_err());
        release(&backend, "a", token_b).await.unwrap();
        assert!(acquire(&backend, "a", &settings(30)).await.is_ok());
    }

    #[tokio::test]
    async fn test_mutual_exclusion_under_contention() {
        let backend = embedded();
        let holders = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let backend = backend.clone();
            let holders = holders.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let token = acquire(&backend, "hot", &settings(5000)).await.unwrap();
                let now = holders.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                holders.fetch_sub(1, Ordering::SeqCst);
                release(&backend, "hot", token).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_more_locks_than_store_capacity_stay_exclusive() {
        let backend = Backend::Embedded(EmbeddedStore::new(2));
        let holder = acquire(&backend, "a", &settings(100)).await.unwrap();
        acquire(&backend, "b", &settings(100)).await.unwrap();
        acquire(&backend, "c", &settings(100)).await.unwrap();

        let second = acquire(&backend, "a", &settings(20)).await;
        assert!(matches!(second, Err(CacheError::LockTimeout(_))));
        release(&backend, "a", holder).await.unwrap();
        assert!(acquire(&backend, "a", &settings(20)).await.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_guard_releases_lock() {
        let backend = embedded();
        {
            let _guard = LockGuard::acquire(&backend, "a", &settings(100)).await.unwrap();
        }
        // Deferred release runs on the runtime
        let token = acquire(&backend, "a", &settings(500)).await;
        assert!(token.is_ok());
    }

    #[tokio::test]
    async fn test_guard_release() {
        let backend = embedded();
        let guard = LockGuard::acquire(&backend, "a", &settings(100)).await.unwrap();
        assert!(!backend.try_lock("a", guard.token().wrapping_add(1), Duration::from_secs(1)).await.unwrap());
        guard.release().await.unwrap();
        assert!(backend.try_lock("a", 7, Duration::from_secs(1)).await.unwrap());
    }
}
