//! In-process counters held in a bounded LRU map.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;

use crate::cache::LruMap;
use crate::counter::{CounterStore, KeyStream};
use crate::error::Result;

/// Counters that live as long as the LRU policy keeps them.
///
/// Cloning is cheap and clones share state.
#[derive(Debug, Clone)]
pub struct EmbeddedCounter {
    counters: Arc<Mutex<LruMap<u64>>>,
}

impl EmbeddedCounter {
    pub fn new(capacity: usize) -> Self {
        Self {
            counters: Arc::new(Mutex::new(LruMap::new(capacity))),
        }
    }
}

impl CounterStore for EmbeddedCounter {
    async fn get(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.counters.lock().get(key).copied())
    }

    async fn incr(&self, key: &str) -> Result<()> {
        let mut counters = self.counters.lock();
        match counters.get_mut(key) {
            Some(value) => *value += 1,
            None => {
                counters.insert(key.to_string(), 1, None);
            }
        }
        Ok(())
    }

    async fn keys(&self) -> Result<KeyStream> {
        let snapshot = self.counters.lock().keys();
        Ok(stream::iter(snapshot.into_iter().map(Ok)).boxed())
    }
}
