//! Counters kept in the shared Redis store.

use futures::stream::{self, StreamExt, TryStreamExt};
use redis::aio::ConnectionManager;

use crate::counter::{CounterStore, KeyStream};
use crate::error::{CacheError, Result};

const PREFIX: &str = "counter:";
const PATTERN: &str = "counter:*";
const SCAN_BATCH: usize = 100;

fn counter_key(key: &str) -> String {
    format!("{}{}", PREFIX, key)
}

fn strip_namespace(key: &str) -> &str {
    key.strip_prefix(PREFIX).unwrap_or(key)
}

/// Counters stored under the `counter:` namespace; they persist until purged externally.
#[derive(Clone)]
pub struct SharedCounter {
    connection_manager: ConnectionManager,
}

impl std::fmt::Debug for SharedCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCounter")
            .field("connection_manager", &"ConnectionManager")
            .finish()
    }
}

impl SharedCounter {
    pub fn new(connection_manager: ConnectionManager) -> Self {
        Self { connection_manager }
    }
}

struct ScanCursor {
    conn: ConnectionManager,
    cursor: u64,
    finished: bool,
}

impl CounterStore for SharedCounter {
    async fn get(&self, key: &str) -> Result<Option<u64>> {
        let mut conn = self.connection_manager.clone();
        let value: Option<u64> = redis::cmd("GET")
            .arg(counter_key(key))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn incr(&self, key: &str) -> Result<()> {
        let mut conn = self.connection_manager.clone();
        let _: u64 = redis::cmd("INCR")
            .arg(counter_key(key))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Streams keys batch by batch with SCAN, so only one batch is held in memory.
    ///
    /// SCAN may report a key more than once.
    async fn keys(&self) -> Result<KeyStream> {
        let start = ScanCursor {
            conn: self.connection_manager.clone(),
            cursor: 0,
            finished: false,
        };

        let batches = stream::try_unfold(start, |mut scan| async move {
            if scan.finished {
                return Ok(None);
            }
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(scan.cursor)
                .arg("MATCH")
                .arg(PATTERN)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut scan.conn)
                .await?;
            scan.cursor = next;
            scan.finished = next == 0;
            Ok::<_, CacheError>(Some((batch, scan)))
        });

        let keys = batches
            .map_ok(|batch| {
                stream::iter(
                    batch
                        .into_iter()
                        .map(|key| Ok::<_, CacheError>(strip_namespace(&key).to_string())),
                )
            })
            .try_flatten();

        Ok(keys.boxed())
    }
}
