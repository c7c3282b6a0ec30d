//! Transit domain objects returned by the upstream provider.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agency {
    pub tag: String,
    pub title: String,
    #[serde(default)]
    pub region_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub tag: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub tag: String,
    pub title: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub stop_id: Option<String>,
}

/// A route together with the stops it serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub tag: String,
    pub title: String,
    #[serde(default)]
    pub stops: Vec<Stop>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub epoch_time: i64,
    pub seconds: i64,
    pub minutes: i64,
    #[serde(default)]
    pub vehicle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionDirection {
    pub title: String,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

/// Arrival predictions for one stop, grouped by direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub stop_title: String,
    #[serde(default)]
    pub directions: Vec<PredictionDirection>,
}

/// One cell of a timetable: a stop and the time a trip reaches it.
///
/// `content` is `"--"` when the trip does not serve the stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleCell {
    pub tag: String,
    pub epoch_time: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub block_id: String,
    #[serde(default)]
    pub stops: Vec<ScheduleCell>,
}

/// A timetable for one service class and direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub service_class: String,
    pub direction: String,
    #[serde(default)]
    pub rows: Vec<ScheduleRow>,
}

/// Earliest and latest scheduled times of a route, in milliseconds since midnight epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulesRange {
    pub start: i64,
    pub end: i64,
}

impl SchedulesRange {
    pub fn contains(&self, time: i64) -> bool {
        time >= self.start && time <= self.end
    }
}

/// An agency's routes split by whether they run at a given time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoutesAvailability {
    pub running: Vec<Route>,
    pub not_running: Vec<Route>,
    pub unknown: Vec<Route>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_optional_fields_default() {
        let stop: Stop = serde_json::from_str(r#"{"tag":"5184","title":"Jones St"}"#).unwrap();
        assert_eq!(stop.lat, None);
        assert_eq!(stop.stop_id, None);
    }

    #[test]
    fn test_route_config_without_stops() {
        let config: RouteConfig = serde_json::from_str(r#"{"tag":"N","title":"N-Judah"}"#).unwrap();
        assert!(config.stops.is_empty());
    }

    #[test]
    fn test_schedules_range_contains_bounds() {
        let range = SchedulesRange { start: 100, end: 200 };
        assert!(range.contains(100));
        assert!(range.contains(200));
        assert!(!range.contains(201));
    }
}
