//! Request and Response models for the transit API
//!
//! This module defines the DTOs used for query parameters and for
//! responses that are not domain objects.

pub mod requests;
pub mod responses;

pub use requests::AvailabilityQuery;
pub use responses::{ErrorResponse, HealthResponse};
