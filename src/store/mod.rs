/// Persistence layer for locations and forecasts.
///
/// `ForecastStore` is the seam between the HTTP surface and the backing
/// store. `pg::PgStore` is the production backend; `memory::MemoryStore`
/// keeps everything in process and backs the `--memory` run mode and tests.
/// The endpoint calls `release_session` after every request, so no
/// database session outlives the request that opened it.
///
/// Location uniqueness is an application rule (4-decimal rounding), not a
/// database constraint, so both backends implement the rounded lookup
/// themselves.

use crate::error::StoreError;
use crate::model::{Forecast, ForecastRecord, Location, Metric, NewForecast};

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

pub trait ForecastStore {
    /// Location whose stored coordinates, rounded to 4 decimals, equal the
    /// rounded input.
    fn find_location_by_rounded_coordinate(
        &mut self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Location>, StoreError>;

    /// Location stored with exactly these coordinates.
    fn find_location_by_exact_coordinate(
        &mut self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Location>, StoreError>;

    fn find_location(&mut self, id: i32) -> Result<Option<Location>, StoreError>;

    fn create_location(&mut self, latitude: f64, longitude: f64) -> Result<Location, StoreError>;

    /// Inserts one forecast.
    ///
    /// # Errors
    /// `StoreError::LocationNotFound` if `forecast.location_id` does not
    /// resolve; nothing is written in that case.
    fn create_forecast(&mut self, forecast: &NewForecast) -> Result<Forecast, StoreError>;

    /// Inserts a batch of provider samples for one location, committed once.
    /// Returns the number of rows written.
    fn insert_forecasts(
        &mut self,
        location_id: i32,
        records: &[ForecastRecord],
    ) -> Result<usize, StoreError>;

    fn list_locations(&mut self) -> Result<Vec<Location>, StoreError>;

    /// All forecasts, most recent `start_date` first.
    fn list_forecasts_by_start_date_desc(&mut self) -> Result<Vec<Forecast>, StoreError>;

    /// All forecasts, highest value of `metric` first.
    fn list_forecasts_by_metric_desc(&mut self, metric: Metric) -> Result<Vec<Forecast>, StoreError>;

    /// Ends the current request's session. The next call starts a new one.
    fn release_session(&mut self) {}
}

/// Returns the location matching the rounded coordinate, creating it if
/// none exists.
pub fn find_or_create_location<S: ForecastStore + ?Sized>(
    store: &mut S,
    latitude: f64,
    longitude: f64,
) -> Result<Location, StoreError> {
    if let Some(existing) = store.find_location_by_rounded_coordinate(latitude, longitude)? {
        return Ok(existing);
    }
    let location = store.create_location(latitude, longitude)?;
    tracing::info!(id = location.id, latitude, longitude, "created location");
    Ok(location)
}
