//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expired entry sweep: reclaims memory held by expired embedded entries

mod cleanup;

pub use cleanup::spawn_cleanup_task;
