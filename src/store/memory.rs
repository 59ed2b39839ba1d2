/// In-process store.
///
/// Keeps rows in insertion order and hands out sequential ids starting at
/// 1, the way a fresh `SERIAL` column would. Orderings use stable sorts so
/// ties keep insertion order, matching the `id ASC` tie-break of the
/// PostgreSQL queries.

use std::cmp::Ordering;

use crate::error::StoreError;
use crate::model::{round_coordinate, Forecast, ForecastRecord, Location, Metric, NewForecast};
use crate::store::ForecastStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    locations: Vec<Location>,
    forecasts: Vec<Forecast>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_location_id(&self) -> i32 {
        self.locations.last().map_or(1, |l| l.id + 1)
    }

    fn next_forecast_id(&self) -> i32 {
        self.forecasts.last().map_or(1, |f| f.id + 1)
    }

    fn push_forecast(&mut self, location_id: i32, record: &ForecastRecord) -> Forecast {
        let forecast = Forecast {
            id: self.next_forecast_id(),
            location_id,
            start_date: record.start_date.clone(),
            end_date: record.end_date.clone(),
            temperature: record.temperature,
            humidity: record.humidity,
        };
        self.forecasts.push(forecast.clone());
        forecast
    }

    fn sorted_forecasts<F>(&self, compare: F) -> Vec<Forecast>
    where
        F: Fn(&Forecast, &Forecast) -> Ordering,
    {
        let mut forecasts = self.forecasts.clone();
        forecasts.sort_by(compare);
        forecasts
    }
}

impl ForecastStore for MemoryStore {
    fn find_location_by_rounded_coordinate(
        &mut self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Location>, StoreError> {
        let (lat, lon) = (round_coordinate(latitude), round_coordinate(longitude));
        Ok(self
            .locations
            .iter()
            .find(|l| round_coordinate(l.latitude) == lat && round_coordinate(l.longitude) == lon)
            .cloned())
    }

    fn find_location_by_exact_coordinate(
        &mut self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Location>, StoreError> {
        Ok(self
            .locations
            .iter()
            .find(|l| l.latitude == latitude && l.longitude == longitude)
            .cloned())
    }

    fn find_location(&mut self, id: i32) -> Result<Option<Location>, StoreError> {
        Ok(self.locations.iter().find(|l| l.id == id).cloned())
    }

    fn create_location(&mut self, latitude: f64, longitude: f64) -> Result<Location, StoreError> {
        let location = Location {
            id: self.next_location_id(),
            latitude,
            longitude,
        };
        self.locations.push(location.clone());
        Ok(location)
    }

    fn create_forecast(&mut self, forecast: &NewForecast) -> Result<Forecast, StoreError> {
        if self.find_location(forecast.location_id)?.is_none() {
            return Err(StoreError::LocationNotFound(forecast.location_id));
        }
        let record = ForecastRecord {
            start_date: forecast.start_date.clone(),
            end_date: forecast.end_date.clone(),
            temperature: forecast.temperature,
            humidity: forecast.humidity,
        };
        Ok(self.push_forecast(forecast.location_id, &record))
    }

    fn insert_forecasts(
        &mut self,
        location_id: i32,
        records: &[ForecastRecord],
    ) -> Result<usize, StoreError> {
        if self.find_location(location_id)?.is_none() {
            return Err(StoreError::LocationNotFound(location_id));
        }
        for record in records {
            self.push_forecast(location_id, record);
        }
        Ok(records.len())
    }

    fn list_locations(&mut self) -> Result<Vec<Location>, StoreError> {
        Ok(self.locations.clone())
    }

    fn list_forecasts_by_start_date_desc(&mut self) -> Result<Vec<Forecast>, StoreError> {
        Ok(self.sorted_forecasts(|a, b| b.start_date.cmp(&a.start_date)))
    }

    fn list_forecasts_by_metric_desc(&mut self, metric: Metric) -> Result<Vec<Forecast>, StoreError> {
        Ok(self.sorted_forecasts(|a, b| {
            b.metric_value(metric).total_cmp(&a.metric_value(metric))
        }))
    }
}
