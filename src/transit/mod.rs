//! Transit Module
//!
//! The upstream provider boundary and the cached data-access layer built on it.

pub mod models;
mod service;
mod upstream;

pub use service::TransitService;
pub use upstream::{HttpUpstream, Upstream, UpstreamError, UpstreamResult};

#[cfg(test)]
pub(crate) use service::tests::{service_with, FakeUpstream};
