//! Shared Store Module
//!
//! Redis-backed store using `redis::aio::ConnectionManager` for async
//! multiplexed connections with automatic reconnection.

use std::time::Duration;

use redis::aio::ConnectionManager;
use tracing::debug;

use crate::cache::StoreBackend;
use crate::error::{CacheError, Result};

/// Deletes the lock record only while it still holds the caller's token.
const RELEASE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

pub(crate) fn data_key(key: &str) -> String {
    format!("cache:{}", key)
}

pub(crate) fn lock_key(key: &str) -> String {
    format!("lock:{}", key)
}

/// Redis expiries are whole milliseconds; anything shorter would mean "no TTL".
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

/// Network store where TTLs are carried natively by each write.
#[derive(Clone)]
pub struct SharedStore {
    connection_manager: ConnectionManager,
    release: redis::Script,
}

impl std::fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStore")
            .field("connection_manager", &"ConnectionManager")
            .finish()
    }
}

impl SharedStore {
    /// Connects to the store at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            CacheError::BackendUnavailable(format!("Failed to create Redis client: {}", e))
        })?;

        let connection_manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::BackendUnavailable(format!("Failed to connect to Redis: {}", e))
        })?;

        debug!(url = %redact_url(url), "Shared store connected");

        Ok(Self::with_connection(connection_manager))
    }

    /// Wraps an already established connection.
    pub fn with_connection(connection_manager: ConnectionManager) -> Self {
        Self {
            connection_manager,
            release: redis::Script::new(RELEASE_SCRIPT),
        }
    }

    /// A handle on the underlying connection, shared with the counters.
    pub fn connection(&self) -> ConnectionManager {
        self.connection_manager.clone()
    }
}

impl StoreBackend for SharedStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection_manager.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(data_key(key))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.connection_manager.clone();
        let _: () = redis::cmd("SET")
            .arg(data_key(key))
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn try_lock(&self, key: &str, token: u64, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection_manager.clone();
        // SET .. NX replies nil when the record already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(lock_key(key))
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn unlock(&self, key: &str, token: u64) -> Result<bool> {
        let mut conn = self.connection_manager.clone();
        let removed: i64 = self
            .release
            .key(lock_key(key))
            .arg(token)
            .invoke_async(&mut conn)
            .await?;
        Ok(removed == 1)
    }

    fn purge_expired(&self) -> usize {
        // Expiry is handled by the server
        0
    }

    fn provider_name(&self) -> &'static str {
        "redis"
    }
}

/// Redact password from a Redis URL for safe logging
pub(crate) fn redact_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos > scheme_end {
                return format!("{}:***{}", &url[..colon_pos], &url[at_pos..]);
            }
        }
    }
    url.to_string()
}
