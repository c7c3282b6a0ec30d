//! API Handlers
//!
//! HTTP request handlers for each transit endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::Cache;
use crate::config::{Config, Provider};
use crate::counter::Counters;
use crate::error::{CacheError, Result};
use crate::models::{AvailabilityQuery, HealthResponse};
use crate::stats::{Hits, StatsRecorder, Times};
use crate::transit::models::{Agency, Prediction, Route, RoutesAvailability, Schedule, Stop};
use crate::transit::{HttpUpstream, TransitService};

/// Counter capacity used when the configured provider has no bound of its own.
const DEFAULT_COUNTER_CAPACITY: usize = 1000;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub transit: TransitService,
    pub stats: StatsRecorder,
}

impl AppState {
    pub fn new(transit: TransitService, stats: StatsRecorder) -> Self {
        Self { transit, stats }
    }

    /// Connects the configured backend and builds the full application state.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let cache = Cache::from_config(config).await?;
        let capacity = match config.provider {
            Provider::Lru { capacity } => capacity,
            Provider::Redis { .. } => DEFAULT_COUNTER_CAPACITY,
        };
        let counters = Counters::for_backend(cache.backend(), capacity);
        let upstream = Arc::new(HttpUpstream::new(config.upstream_url.clone()));
        Ok(Self::new(
            TransitService::new(cache, upstream),
            StatsRecorder::new(counters),
        ))
    }
}

fn found<T>(item: Option<T>, what: impl FnOnce() -> String) -> Result<Json<T>> {
    item.map(Json).ok_or_else(|| CacheError::NotFound(what()))
}

/// Handler for GET /api/agencies
pub async fn agencies_handler(State(state): State<AppState>) -> Result<Json<Vec<Agency>>> {
    Ok(Json(state.transit.agencies().await?))
}

/// Handler for GET /api/agencies/:agency
pub async fn agency_handler(
    State(state): State<AppState>,
    Path(agency): Path<String>,
) -> Result<Json<Agency>> {
    let item = state.transit.agency(&agency).await?;
    found(item, || format!("agency '{}'", agency))
}

/// Handler for GET /api/agencies/:agency/routes
pub async fn routes_handler(
    State(state): State<AppState>,
    Path(agency): Path<String>,
) -> Result<Json<Vec<Route>>> {
    Ok(Json(state.transit.routes(&agency).await?))
}

/// Handler for GET /api/agencies/:agency/routes/availability
///
/// Splits the agency's routes into running, not running and unknown at the
/// requested time of day.
pub async fn availability_handler(
    State(state): State<AppState>,
    Path(agency): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<RoutesAvailability>> {
    let time = query.millis_since_midnight()?;
    Ok(Json(state.transit.routes_availability(&agency, time).await?))
}

/// Handler for GET /api/agencies/:agency/routes/:route
pub async fn route_handler(
    State(state): State<AppState>,
    Path((agency, route)): Path<(String, String)>,
) -> Result<Json<Route>> {
    let item = state.transit.route(&agency, &route).await?;
    found(item, || format!("route '{}' of agency '{}'", route, agency))
}

/// Handler for GET /api/agencies/:agency/routes/:route/stops
pub async fn stops_handler(
    State(state): State<AppState>,
    Path((agency, route)): Path<(String, String)>,
) -> Result<Json<Vec<Stop>>> {
    Ok(Json(state.transit.stops(&agency, &route).await?))
}

/// Handler for GET /api/agencies/:agency/routes/:route/stops/:stop
pub async fn stop_handler(
    State(state): State<AppState>,
    Path((agency, route, stop)): Path<(String, String, String)>,
) -> Result<Json<Stop>> {
    let item = state.transit.stop(&agency, &route, &stop).await?;
    found(item, || format!("stop '{}' on route '{}'", stop, route))
}

/// Handler for GET /api/agencies/:agency/routes/:route/stops/:stop/predictions
pub async fn predictions_handler(
    State(state): State<AppState>,
    Path((agency, route, stop)): Path<(String, String, String)>,
) -> Result<Json<Vec<Prediction>>> {
    Ok(Json(state.transit.predictions(&agency, &route, &stop).await?))
}

/// Handler for GET /api/agencies/:agency/routes/:route/schedules
pub async fn schedules_handler(
    State(state): State<AppState>,
    Path((agency, route)): Path<(String, String)>,
) -> Result<Json<Vec<Schedule>>> {
    Ok(Json(state.transit.schedules(&agency, &route).await?))
}

/// Handler for GET /api/stats/hits
pub async fn hits_handler(State(state): State<AppState>) -> Result<Json<Vec<Hits>>> {
    Ok(Json(state.stats.hits().await?))
}

/// Handler for GET /api/stats/times
pub async fn times_handler(State(state): State<AppState>) -> Result<Json<Vec<Times>>> {
    Ok(Json(state.stats.times().await?))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.transit.cache().backend().provider_name(),
    ))
}
