//! Cached data access for every transit resource.
//!
//! Each collection is cached whole under its own key; single items are
//! looked up by filtering the owning collection.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::cache::Cache;
use crate::error::{CacheError, Result};
use crate::transit::models::{
    Agency, Prediction, RouteConfig, Route, RoutesAvailability, Schedule, SchedulesRange, Stop,
};
use crate::transit::Upstream;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const NOT_SERVED: &str = "--";
/// Schedules fetched at once while computing availability.
const AVAILABILITY_CONCURRENCY: usize = 4;

/// Read-through access to the upstream provider.
#[derive(Clone)]
pub struct TransitService {
    cache: Cache,
    upstream: Arc<dyn Upstream>,
}

impl std::fmt::Debug for TransitService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitService")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl TransitService {
    pub fn new(cache: Cache, upstream: Arc<dyn Upstream>) -> Self {
        Self { cache, upstream }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    // == Collections ==

    pub async fn agencies(&self) -> Result<Vec<Agency>> {
        self.cache
            .fetch_through("agencies", || self.upstream.agencies())
            .await
    }

    pub async fn routes(&self, agency: &str) -> Result<Vec<Route>> {
        let key = format!("agencies/{}/routes", agency);
        self.cache
            .fetch_through(&key, || self.upstream.routes(agency))
            .await
    }

    /// Stops of a route, taken from its cached route configuration.
    pub async fn stops(&self, agency: &str, route: &str) -> Result<Vec<Stop>> {
        let key = format!("agencies/{}/routes/{}/config", agency, route);
        let config: RouteConfig = self
            .cache
            .fetch_through(&key, || self.upstream.route_config(agency, route))
            .await?;
        Ok(config.stops)
    }

    /// Predictions for a stop across every direction.
    pub async fn predictions(&self, agency: &str, route: &str, stop: &str) -> Result<Vec<Prediction>> {
        let key = format!(
            "agencies/{}/routes/{}/stops/{}/predictions",
            agency, route, stop
        );
        let predictions = self
            .cache
            .fetch_through(&key, || self.upstream.predictions(agency, route, stop))
            .await?;
        Ok(predictions
            .directions
            .into_iter()
            .flat_map(|direction| direction.predictions)
            .collect())
    }

    pub async fn schedules(&self, agency: &str, route: &str) -> Result<Vec<Schedule>> {
        let key = format!("agencies/{}/routes/{}/schedules", agency, route);
        self.cache
            .fetch_through(&key, || self.upstream.schedules(agency, route))
            .await
    }

    // == Single items ==

    pub async fn agency(&self, agency: &str) -> Result<Option<Agency>> {
        Ok(self.agencies().await?.into_iter().find(|a| a.tag == agency))
    }

    pub async fn route(&self, agency: &str, route: &str) -> Result<Option<Route>> {
        Ok(self.routes(agency).await?.into_iter().find(|r| r.tag == route))
    }

    pub async fn stop(&self, agency: &str, route: &str, stop: &str) -> Result<Option<Stop>> {
        Ok(self
            .stops(agency, route)
            .await?
            .into_iter()
            .find(|s| s.tag == stop))
    }

    // == Availability ==

    /// Earliest and latest served times across a route's schedules.
    ///
    /// Returns `None` when no cell of any schedule is served.
    pub async fn schedules_range(&self, agency: &str, route: &str) -> Result<Option<SchedulesRange>> {
        let schedules = self.schedules(agency, route).await?;
        let mut range: Option<SchedulesRange> = None;

        let cells = schedules
            .iter()
            .flat_map(|schedule| &schedule.rows)
            .flat_map(|row| &row.stops)
            .filter(|cell| cell.content != NOT_SERVED);

        for cell in cells {
            let epoch: i64 = cell.epoch_time.trim().parse().map_err(|_| {
                CacheError::InvalidRequest(format!(
                    "schedule for {}/{} has a malformed epoch time: '{}'",
                    agency, route, cell.epoch_time
                ))
            })?;
            range = Some(match range {
                Some(r) => SchedulesRange {
                    start: r.start.min(epoch),
                    end: r.end.max(epoch),
                },
                None => SchedulesRange {
                    start: epoch,
                    end: epoch,
                },
            });
        }
        Ok(range)
    }

    /// Splits an agency's routes by whether they run at `time` (ms since midnight).
    ///
    /// A route also counts as running when `time` on the following day falls
    /// in its range, for schedules that run past midnight. Routes whose range
    /// cannot be determined are reported as unknown. At most
    /// `AVAILABILITY_CONCURRENCY` schedules are fetched at a time.
    pub async fn routes_availability(&self, agency: &str, time: i64) -> Result<RoutesAvailability> {
        let routes = self.routes(agency).await?;
        let tags: Vec<String> = routes.iter().map(|route| route.tag.clone()).collect();
        let ranges: Vec<_> = stream::iter(tags)
            .map(|tag| async move { self.schedules_range(agency, &tag).await })
            .buffered(AVAILABILITY_CONCURRENCY)
            .collect()
            .await;

        let mut availability = RoutesAvailability::default();
        for (route, range) in routes.into_iter().zip(ranges) {
            match range {
                Ok(Some(range)) if range.contains(time) || range.contains(time + DAY_MS) => {
                    availability.running.push(route)
                }
                Ok(Some(_)) => availability.not_running.push(route),
                Ok(None) => {
                    warn!(agency = %agency, route = %route.tag, "Route has an empty schedule");
                    availability.unknown.push(route)
                }
                Err(e) => {
                    warn!(agency = %agency, route = %route.tag, error = %e, "Route schedule unavailable");
                    availability.unknown.push(route)
                }
            }
        }
        Ok(availability)
    }
}
