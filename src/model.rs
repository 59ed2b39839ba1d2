/// Shared data types for the forecast service.
///
/// Persisted entities (`Location`, `Forecast`), provider samples that have
/// not been stored yet (`ForecastRecord`, `LocationForecasts`), the body of
/// a direct forecast save (`NewForecast`) and the ranking `Metric`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MetricError;

/// Timestamp layout the provider emits and the aggregations require.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Decimal places used when deduplicating coordinates.
pub const COORDINATE_PRECISION: i32 = 4;

// ---------------------------------------------------------------------------
// Persisted entities
// ---------------------------------------------------------------------------

/// A latitude/longitude pair, deduplicated at 4-decimal precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i32,
    pub latitude: f64,
    pub longitude: f64,
}

/// One stored hourly sample for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub id: i32,
    pub location_id: i32,
    pub start_date: String,
    pub end_date: String,
    pub temperature: f64,
    pub humidity: f64,
}

impl Forecast {
    /// Value of the given metric for this sample.
    pub fn metric_value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
        }
    }
}

/// Body of `POST /forecast/saveForecast`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewForecast {
    pub location_id: i32,
    pub start_date: String,
    pub end_date: String,
    pub temperature: f64,
    pub humidity: f64,
}

// ---------------------------------------------------------------------------
// Provider samples
// ---------------------------------------------------------------------------

/// A single sample mapped from the provider response, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub start_date: String,
    pub end_date: String,
    pub temperature: f64,
    pub humidity: f64,
}

/// Provider result for one requested coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationForecasts {
    pub latitude: f64,
    pub longitude: f64,
    pub forecasts: Vec<ForecastRecord>,
}

// ---------------------------------------------------------------------------
// Ranking metric
// ---------------------------------------------------------------------------

/// Column a top-N query ranks by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Temperature,
    Humidity,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Temperature, Metric::Humidity];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| MetricError::Invalid(s.to_string()))
    }
}

/// Rounds a coordinate to the precision used for location dedup.
pub fn round_coordinate(value: f64) -> f64 {
    let factor = 10f64.powi(COORDINATE_PRECISION);
    (value * factor).round() / factor
}
