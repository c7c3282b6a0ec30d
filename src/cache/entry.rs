//! Cache Entry Module
//!
//! Defines the structure for individual embedded entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single value held by the embedded store, with its expiry deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Expiration deadline, None = no expiration
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry that expires `ttl` from now, or never when `ttl` is None.
    pub fn new(value: V, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now` reaches its deadline, so a fully elapsed
    /// TTL never yields the value again.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Checks if the entry has expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, or None if no expiration is set.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new(b"payload".to_vec(), None);
        assert_eq!(entry.value, b"payload");
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
        assert!(entry.ttl_remaining().is_none());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = CacheEntry::new(7u64, Some(Duration::from_secs(60)));
        assert!(entry.expires_at.is_some());
        assert!(!entry.is_expired());
        let remaining = entry.ttl_remaining().unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining >= Duration::from_secs(59));
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(1u64, Some(Duration::from_millis(30)));
        assert!(!entry.is_expired());
        sleep(Duration::from_millis(50));
        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Instant::now();
        let entry = CacheEntry {
            value: 1u64,
            expires_at: Some(now),
        };
        assert!(entry.is_expired_at(now), "Entry should be expired at boundary");
    }
}
