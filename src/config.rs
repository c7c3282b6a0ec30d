//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Which backend family stores cached data, locks and counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// Embedded, in-process LRU store bounded to `capacity` entries
    Lru { capacity: usize },
    /// Shared network store reachable at `url`
    Redis { url: String },
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Selected backend
    pub provider: Provider,
    /// Lifetime of cached data entries
    pub ttl_data: Duration,
    /// Lifetime of lock records
    pub ttl_lock: Duration,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Base URL of the upstream transit data provider
    pub upstream_url: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PROVIDER` - `lru` or `redis` (default: lru)
    /// - `LRU_CAPACITY` - Maximum embedded entries (default: 1000)
    /// - `REDIS_URL` - Shared store address (default: redis://127.0.0.1:6379)
    /// - `CACHE_TTL_DATA_MS` - Data TTL in milliseconds (default: 300000)
    /// - `CACHE_TTL_LOCK_MS` - Lock TTL in milliseconds (default: 10000)
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `UPSTREAM_URL` - Upstream provider base URL (default: http://127.0.0.1:9000)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let provider = match lookup("CACHE_PROVIDER").as_deref().unwrap_or("lru") {
            "lru" => Provider::Lru {
                capacity: parse_var(&lookup, "LRU_CAPACITY", 1000)?,
            },
            "redis" => Provider::Redis {
                url: lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            },
            other => {
                return Err(CacheError::Config(format!(
                    "unknown cache provider '{}', expected 'lru' or 'redis'",
                    other
                )))
            }
        };

        let ttl_data = Duration::from_millis(parse_var(
            &lookup,
            "CACHE_TTL_DATA_MS",
            defaults.ttl_data.as_millis() as u64,
        )?);
        let ttl_lock = Duration::from_millis(parse_var(
            &lookup,
            "CACHE_TTL_LOCK_MS",
            defaults.ttl_lock.as_millis() as u64,
        )?);
        if ttl_data.is_zero() || ttl_lock.is_zero() {
            return Err(CacheError::Config("TTLs must be greater than zero".to_string()));
        }

        Ok(Self {
            provider,
            ttl_data,
            ttl_lock,
            server_port: parse_var(&lookup, "SERVER_PORT", defaults.server_port)?,
            cleanup_interval: parse_var(&lookup, "CLEANUP_INTERVAL", defaults.cleanup_interval)?,
            upstream_url: lookup("UPSTREAM_URL").unwrap_or(defaults.upstream_url),
        })
    }
}

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CacheError::Config(format!("{} has an invalid value: '{}'", name, raw))),
        None => Ok(default),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::Lru { capacity: 1000 },
            ttl_data: Duration::from_secs(300),
            ttl_lock: Duration::from_secs(10),
            server_port: 8080,
            cleanup_interval: 1,
            upstream_url: "http://127.0.0.1:9000".to_string(),
        }
    }
}
