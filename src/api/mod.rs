//! API Module
//!
//! HTTP handlers and routing for the transit REST API.
//!
//! # Endpoints
//! - `GET /api/agencies` and `GET /api/agencies/:agency`
//! - `GET /api/agencies/:agency/routes`, `.../routes/availability`, `.../routes/:route`
//! - `GET .../routes/:route/stops`, `.../stops/:stop`, `.../stops/:stop/predictions`
//! - `GET .../routes/:route/schedules`
//! - `GET /api/stats/hits` and `GET /api/stats/times`
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
