//! LRU Module
//!
//! Least Recently Used tracking and the bounded map the embedded backend is built on.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use crate::cache::CacheEntry;

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Every touch stamps the key with a fresh tick; the smallest tick is the
/// least recently used key.
#[derive(Debug, Default)]
pub struct LruTracker {
    order: BTreeMap<u64, String>,
    ticks: HashMap<String, u64>,
    clock: u64,
}

impl LruTracker {
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a key as most recently used.
    pub fn touch(&mut self, key: &str) {
        if let Some(tick) = self.ticks.get_mut(key) {
            self.order.remove(&*tick);
            self.clock += 1;
            *tick = self.clock;
            self.order.insert(self.clock, key.to_string());
            return;
        }
        self.clock += 1;
        self.order.insert(self.clock, key.to_string());
        self.ticks.insert(key.to_string(), self.clock);
    }

    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        if let Some(tick) = self.ticks.remove(key) {
            self.order.remove(&tick);
        }
    }

    /// Returns and removes the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.ticks.remove(&key);
        Some(key)
    }

    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.order.first_key_value().map(|(_, key)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ticks.contains_key(key)
    }
}

// == LRU Map ==
/// A capacity-bounded map with strict LRU eviction and lazy per-entry TTL.
///
/// Reads of an expired entry remove it and report absence.
#[derive(Debug)]
pub struct LruMap<V> {
    entries: HashMap<String, CacheEntry<V>>,
    lru: LruTracker,
    capacity: usize,
}

impl<V> LruMap<V> {
    /// Creates an empty map holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            capacity: capacity.max(1),
        }
    }

    /// Returns the live value for `key`, marking it most recently used.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        self.get_mut(key).map(|value| &*value)
    }

    /// Mutable variant of [`LruMap::get`].
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let expired = self.entries.get(key)?.is_expired();
        if expired {
            self.remove(key);
            return None;
        }
        self.lru.touch(key);
        self.entries.get_mut(key).map(|entry| &mut entry.value)
    }

    /// Stores `value` under `key`, replacing any previous entry and resetting its TTL.
    ///
    /// If the map is at capacity and `key` is new, the least recently used
    /// entry is discarded first; its key is returned.
    pub fn insert(&mut self, key: String, value: V, ttl: Option<Duration>) -> Option<String> {
        let mut evicted = None;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            if let Some(oldest) = self.lru.evict_oldest() {
                self.entries.remove(&oldest);
                evicted = Some(oldest);
            }
        }
        self.lru.touch(&key);
        self.entries.insert(key, CacheEntry::new(value, ttl));
        evicted
    }

    /// Removes `key`, returning its value if it was present (expired or not).
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.lru.remove(key);
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Removes every expired entry, returning how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    /// Snapshot of the keys currently held, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
