/// Meteomatics weather API client.
///
/// Handles URL construction, the blocking HTTP call and JSON response
/// mapping for the time-series endpoint:
///   https://api.meteomatics.com/{start}--{end}:PT1H/{parameters}/{lat},{lon}/json
///
/// Requests are issued one coordinate at a time, strictly in order. A
/// coordinate whose request fails is logged and reported as `None`; there
/// is no retry and no timeout, so a slow provider blocks the caller until it
/// answers or the connection fails.

use chrono::{Duration, NaiveDate};
use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::model::{ForecastRecord, LocationForecasts};

/// Hourly 2 m air temperature in °C.
pub const PARAM_TEMPERATURE: &str = "t_2m:C";
/// Hourly 2 m relative humidity in percent.
pub const PARAM_HUMIDITY: &str = "relative_humidity_2m:p";
/// Sampling step requested from the provider.
pub const SAMPLE_INTERVAL: &str = "PT1H";

// ---------------------------------------------------------------------------
// Serde structures for the provider JSON
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ProviderResponse {
    data: Vec<ParameterSeries>,
}

#[derive(Deserialize)]
struct ParameterSeries {
    parameter: String,
    coordinates: Vec<CoordinateSeries>,
}

#[derive(Deserialize)]
struct CoordinateSeries {
    dates: Vec<DateValue>,
}

#[derive(Deserialize)]
struct DateValue {
    date: String,
    value: f64,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Builds the time-series URL for one coordinate over whole days
/// `start..=end`, sampled hourly from midnight UTC.
pub fn build_forecast_url(
    base_url: &str,
    model: &str,
    start: NaiveDate,
    end: NaiveDate,
    latitude: f64,
    longitude: f64,
) -> String {
    format!(
        "{}/{}T00:00:00Z--{}T00:00:00Z:{}/{},{}/{},{}/json?model={}",
        base_url.trim_end_matches('/'),
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d"),
        SAMPLE_INTERVAL,
        PARAM_TEMPERATURE,
        PARAM_HUMIDITY,
        latitude,
        longitude,
        model
    )
}

/// First and last day of a `days`-long window starting at `today`.
pub fn forecast_window(today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let span = i64::from(days.saturating_sub(1));
    (today, today + Duration::days(span))
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Maps a provider response body into per-sample records.
///
/// Temperature and humidity series are located by parameter name and
/// paired by index, not by timestamp. If either series is absent the
/// result is empty.
///
/// # Errors
/// `ProviderError::Parse` when the body is not the expected JSON shape.
pub fn parse_forecast_response(json: &str) -> Result<Vec<ForecastRecord>, ProviderError> {
    let response: ProviderResponse = serde_json::from_str(json)?;

    let (Some(temperature), Some(humidity)) = (
        find_series(&response.data, PARAM_TEMPERATURE),
        find_series(&response.data, PARAM_HUMIDITY),
    ) else {
        return Ok(Vec::new());
    };

    Ok(temperature
        .dates
        .iter()
        .zip(&humidity.dates)
        .map(|(t, h)| ForecastRecord {
            start_date: t.date.clone(),
            end_date: t.date.clone(),
            temperature: t.value,
            humidity: h.value,
        })
        .collect())
}

/// First coordinate's series for the named parameter.
fn find_series<'a>(data: &'a [ParameterSeries], name: &str) -> Option<&'a CoordinateSeries> {
    data.iter()
        .find(|p| p.parameter == name)
        .and_then(|p| p.coordinates.first())
}

// ---------------------------------------------------------------------------
// API client
// ---------------------------------------------------------------------------

/// Anything that can produce forecasts for a list of coordinates.
///
/// The output has one entry per input coordinate, in order; `None` marks a
/// coordinate whose fetch failed.
pub trait ForecastSource {
    fn fetch_many(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        coordinates: &[(f64, f64)],
    ) -> Vec<Option<LocationForecasts>>;
}

/// Blocking client for the Meteomatics API.
pub struct MeteomaticsClient {
    http: reqwest::blocking::Client,
    config: ProviderConfig,
}

impl MeteomaticsClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        // The blocking client defaults to a 30s timeout; the provider can be slower.
        let http = reqwest::blocking::Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()?;
        Ok(Self { http, config })
    }

    /// URL for one coordinate, without credentials.
    pub fn forecast_url(&self, start: NaiveDate, end: NaiveDate, latitude: f64, longitude: f64) -> String {
        build_forecast_url(
            &self.config.base_url,
            &self.config.model,
            start,
            end,
            latitude,
            longitude,
        )
    }

    /// Issues one request and maps the body.
    ///
    /// # Errors
    /// - `ProviderError::Status` for any non-2xx response.
    /// - `ProviderError::Request` on transport failure.
    /// - `ProviderError::Parse` on an unexpected body.
    pub fn request_forecast(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<ForecastRecord>, ProviderError> {
        let url = self.forecast_url(start, end, latitude, longitude);
        tracing::debug!(%url, "requesting forecast");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("Content-Type", "application/json")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = response.text()?;
        parse_forecast_response(&body)
    }

    /// Forecast records for a single coordinate, or `None` if the request
    /// failed for any reason. The failure is logged.
    pub fn fetch_one(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        latitude: f64,
        longitude: f64,
    ) -> Option<Vec<ForecastRecord>> {
        match self.request_forecast(start, end, latitude, longitude) {
            Ok(records) => {
                tracing::debug!(latitude, longitude, count = records.len(), "forecast fetched");
                Some(records)
            }
            Err(ProviderError::Status(code)) => {
                tracing::warn!(status = code, latitude, longitude, "provider returned an error status");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, latitude, longitude, "forecast fetch failed");
                None
            }
        }
    }
}

impl ForecastSource for MeteomaticsClient {
    fn fetch_many(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        coordinates: &[(f64, f64)],
    ) -> Vec<Option<LocationForecasts>> {
        coordinates
            .iter()
            .map(|&(latitude, longitude)| {
                self.fetch_one(start, end, latitude, longitude)
                    .map(|forecasts| LocationForecasts {
                        latitude,
                        longitude,
                        forecasts,
                    })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
