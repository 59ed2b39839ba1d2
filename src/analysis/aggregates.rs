/// Aggregate queries over stored forecasts.
///
/// All three queries work on the full forecast table loaded into memory.
/// Latest-per-day and the rolling average take forecasts ordered by
/// `start_date` descending and group them by location, then by the
/// calendar date of `start_date`. Top-N takes forecasts ordered by the
/// ranking metric descending.
///
/// Calendar dates are parsed strictly from `YYYY-MM-DDTHH:MM:SSZ`. A stored
/// value in any other shape fails the whole query: it means a row was
/// written by something other than this service.

use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::error::AggregateError;
use crate::model::{Forecast, Location, Metric, TIMESTAMP_FORMAT};

/// Number of most recent samples averaged per location and day.
pub const ROLLING_WINDOW: usize = 3;

/// location_id → (calendar date → latest forecast on that date).
pub type LatestForecasts = BTreeMap<i32, BTreeMap<NaiveDate, Forecast>>;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Rolling average temperature for one location on one calendar date.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DailyAverage {
    pub location_id: i32,
    pub date: NaiveDate,
    pub average_temperature: f64,
}

/// One entry of a top-N ranking. Serializes the value under the metric's
/// name, e.g. `{"location_id": 3, "latitude": .., "longitude": .., "temperature": 25.0}`.
#[derive(Debug, Clone, PartialEq)]
pub struct TopLocation {
    pub location_id: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub metric: Metric,
    pub value: f64,
}

impl Serialize for TopLocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("location_id", &self.location_id)?;
        map.serialize_entry("latitude", &self.latitude)?;
        map.serialize_entry("longitude", &self.longitude)?;
        map.serialize_entry(self.metric.as_str(), &self.value)?;
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Forecasts of one location on one calendar date, in scan order.
struct DayGroup<'a> {
    date: NaiveDate,
    forecasts: Vec<&'a Forecast>,
}

/// All day groups of one location, in the order dates were first seen.
struct LocationGroup<'a> {
    location_id: i32,
    days: Vec<DayGroup<'a>>,
}

/// Calendar date of a forecast's `start_date`.
pub fn calendar_date(forecast: &Forecast) -> Result<NaiveDate, AggregateError> {
    NaiveDateTime::parse_from_str(&forecast.start_date, TIMESTAMP_FORMAT)
        .map(|dt| dt.date())
        .map_err(|e| AggregateError::MalformedTimestamp {
            forecast_id: forecast.id,
            value: forecast.start_date.clone(),
            reason: e.to_string(),
        })
}

/// Groups forecasts by location and then by date, preserving first-seen
/// order at both levels.
fn group_by_location_and_day(forecasts: &[Forecast]) -> Result<Vec<LocationGroup<'_>>, AggregateError> {
    let mut groups: Vec<LocationGroup<'_>> = Vec::new();
    let mut location_index: HashMap<i32, usize> = HashMap::new();
    let mut day_index: HashMap<(i32, NaiveDate), usize> = HashMap::new();

    for forecast in forecasts {
        let date = calendar_date(forecast)?;

        let loc_pos = *location_index.entry(forecast.location_id).or_insert_with(|| {
            groups.push(LocationGroup {
                location_id: forecast.location_id,
                days: Vec::new(),
            });
            groups.len() - 1
        });
        let location = &mut groups[loc_pos];

        let day_pos = *day_index
            .entry((forecast.location_id, date))
            .or_insert_with(|| {
                location.days.push(DayGroup {
                    date,
                    forecasts: Vec::new(),
                });
                location.days.len() - 1
            });
        location.days[day_pos].forecasts.push(forecast);
    }

    Ok(groups)
}

// ---------------------------------------------------------------------------
// Latest per day
// ---------------------------------------------------------------------------

/// Latest forecast per location per calendar date.
///
/// `forecasts` must be ordered by `start_date` descending; the first
/// forecast seen for a (location, date) pair wins.
pub fn latest_per_day(forecasts: &[Forecast]) -> Result<LatestForecasts, AggregateError> {
    let mut result = LatestForecasts::new();

    for location in group_by_location_and_day(forecasts)? {
        let days = result.entry(location.location_id).or_default();
        for day in location.days {
            if let Some(first) = day.forecasts.first() {
                days.insert(day.date, (*first).clone());
            }
        }
    }

    Ok(result)
}

// ---------------------------------------------------------------------------
// Rolling average
// ---------------------------------------------------------------------------

/// Fixed-capacity FIFO of samples. Pushing past capacity evicts the oldest
/// retained sample.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn push(&mut self, sample: f64) {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Average temperature of the 3 most recent forecasts per location and
/// calendar date, rounded to 2 decimals.
///
/// `forecasts` must be ordered by `start_date` descending. The output
/// follows group build order: locations in first-seen order, and within a
/// location, dates in first-seen order.
pub fn rolling_averages(forecasts: &[Forecast]) -> Result<Vec<DailyAverage>, AggregateError> {
    let mut averages = Vec::new();

    for location in group_by_location_and_day(forecasts)? {
        for day in location.days {
            // Feed oldest first so the window ends up holding the newest samples.
            let mut window = RollingWindow::new(ROLLING_WINDOW);
            for forecast in day.forecasts.iter().rev() {
                window.push(forecast.temperature);
            }

            if let Some(mean) = window.mean() {
                averages.push(DailyAverage {
                    location_id: location.location_id,
                    date: day.date,
                    average_temperature: round_to_hundredths(mean),
                });
            }
        }
    }

    Ok(averages)
}

// ---------------------------------------------------------------------------
// Top-N
// ---------------------------------------------------------------------------

/// Top `n` distinct locations by `metric`.
///
/// `forecasts` must be ordered by `metric` descending; each location is
/// represented by the first forecast seen for it. Fewer than `n` distinct
/// locations yields a shorter list.
pub fn top_locations(
    forecasts: &[Forecast],
    locations: &HashMap<i32, Location>,
    metric: Metric,
    n: usize,
) -> Vec<TopLocation> {
    let mut result = Vec::with_capacity(n.min(locations.len()));
    let mut seen = HashSet::new();

    for forecast in forecasts {
        if result.len() >= n {
            break;
        }
        if !seen.insert(forecast.location_id) {
            continue;
        }
        let Some(location) = locations.get(&forecast.location_id) else {
            tracing::warn!(
                forecast_id = forecast.id,
                location_id = forecast.location_id,
                "forecast references a missing location"
            );
            continue;
        };
        result.push(TopLocation {
            location_id: location.id,
            latitude: location.latitude,
            longitude: location.longitude,
            metric,
            value: forecast.metric_value(metric),
        });
    }

    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
