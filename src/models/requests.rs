//! Request DTOs for the transit API
//!
//! Defines the structure of incoming query parameters.

use chrono::{NaiveTime, Timelike, Utc};
use serde::Deserialize;

use crate::error::{CacheError, Result};

/// Query parameters for GET /api/agencies/:agency/routes/availability
///
/// # Fields
/// - `time`: time of day as `H`, `HH`, `H:MM`, `HH:MM` or `HH:MM:SS`;
///   the current UTC time when omitted
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityQuery {
    #[serde(default)]
    pub time: Option<String>,
}

impl AvailabilityQuery {
    /// Milliseconds since midnight of the requested time of day.
    pub fn millis_since_midnight(&self) -> Result<i64> {
        let time = match self.time.as_deref().map(str::trim) {
            None | Some("") => Utc::now().time(),
            Some(raw) => parse_time_of_day(raw)?,
        };
        Ok(i64::from(time.num_seconds_from_midnight()) * 1000)
    }
}

/// Parses a possibly abbreviated `HH:MM:SS` time of day.
fn parse_time_of_day(raw: &str) -> Result<NaiveTime> {
    let normalized = match raw.len() {
        1 => format!("0{}:00:00", raw),
        2 => format!("{}:00:00", raw),
        4 => format!("0{}:00", raw),
        5 => format!("{}:00", raw),
        _ => raw.to_string(),
    };
    NaiveTime::parse_from_str(&normalized, "%H:%M:%S").map_err(|_| {
        CacheError::InvalidRequest(format!(
            "Invalid time '{}': expected H, HH, H:MM, HH:MM or HH:MM:SS",
            raw
        ))
    })
}
