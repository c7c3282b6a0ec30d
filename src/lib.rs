//! Transit Cache - A read-through cache in front of a rate-limited transit data provider
//!
//! Provides cached agency, route, stop, prediction and schedule lookups with
//! per-key stampede protection, over an embedded LRU store or a shared Redis
//! store, plus request hit and latency statistics.

pub mod api;
pub mod cache;
pub mod config;
pub mod counter;
pub mod error;
pub mod models;
pub mod stats;
pub mod tasks;
pub mod transit;

pub use api::AppState;
pub use cache::Cache;
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
