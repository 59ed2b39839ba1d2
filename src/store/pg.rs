/// PostgreSQL-backed store.
///
/// Each request gets its own database session: the first store call of a
/// request connects, `release_session` drops the connection when the
/// request ends. A backend that went away between requests therefore never
/// affects the next one. Each logical save runs in its own transaction and
/// commits once.

use postgres::{Client, NoTls, Row};

use crate::error::StoreError;
use crate::model::{Forecast, ForecastRecord, Location, Metric, NewForecast};
use crate::store::ForecastStore;

const SELECT_FORECAST: &str =
    "SELECT id, location_id, start_date, end_date, temperature, humidity FROM forecast";

const INSERT_FORECAST: &str = "INSERT INTO forecast \
     (location_id, start_date, end_date, temperature, humidity) \
     VALUES ($1, $2, $3, $4, $5) \
     RETURNING id";

pub struct PgStore {
    database_url: String,
    session: Option<Client>,
}

impl PgStore {
    /// Store that connects to `database_url` on demand. The schema is
    /// expected to exist already (see `db::connect_and_prepare`).
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            session: None,
        }
    }

    /// Store whose first request reuses an already open connection.
    pub fn with_session(database_url: impl Into<String>, client: Client) -> Self {
        Self {
            database_url: database_url.into(),
            session: Some(client),
        }
    }

    /// Connection for the current request, opened if there is none or the
    /// previous one was closed.
    pub fn session(&mut self) -> Result<&mut Client, StoreError> {
        let client = match self.session.take() {
            Some(client) if !client.is_closed() => client,
            stale => {
                if stale.is_some() {
                    tracing::warn!("database session closed, reconnecting");
                }
                let client = Client::connect(&self.database_url, NoTls)?;
                tracing::debug!("database session opened");
                client
            }
        };
        Ok(self.session.insert(client))
    }
}

fn location_from_row(row: &Row) -> Location {
    Location {
        id: row.get(0),
        latitude: row.get(1),
        longitude: row.get(2),
    }
}

fn forecast_from_row(row: &Row) -> Forecast {
    Forecast {
        id: row.get(0),
        location_id: row.get(1),
        start_date: row.get(2),
        end_date: row.get(3),
        temperature: row.get(4),
        humidity: row.get(5),
    }
}

impl ForecastStore for PgStore {
    fn find_location_by_rounded_coordinate(
        &mut self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Location>, StoreError> {
        let row = self.session()?.query_opt(
            "SELECT id, latitude, longitude FROM location
             WHERE round(latitude::numeric, 4) = round($1::float8::numeric, 4)
               AND round(longitude::numeric, 4) = round($2::float8::numeric, 4)
             ORDER BY id
             LIMIT 1",
            &[&latitude, &longitude],
        )?;
        Ok(row.as_ref().map(location_from_row))
    }

    fn find_location_by_exact_coordinate(
        &mut self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Location>, StoreError> {
        let row = self.session()?.query_opt(
            "SELECT id, latitude, longitude FROM location
             WHERE latitude = $1 AND longitude = $2
             ORDER BY id
             LIMIT 1",
            &[&latitude, &longitude],
        )?;
        Ok(row.as_ref().map(location_from_row))
    }

    fn find_location(&mut self, id: i32) -> Result<Option<Location>, StoreError> {
        let row = self.session()?.query_opt(
            "SELECT id, latitude, longitude FROM location WHERE id = $1",
            &[&id],
        )?;
        Ok(row.as_ref().map(location_from_row))
    }

    fn create_location(&mut self, latitude: f64, longitude: f64) -> Result<Location, StoreError> {
        let row = self.session()?.query_one(
            "INSERT INTO location (latitude, longitude) VALUES ($1, $2) RETURNING id",
            &[&latitude, &longitude],
        )?;
        Ok(Location {
            id: row.get(0),
            latitude,
            longitude,
        })
    }

    fn create_forecast(&mut self, forecast: &NewForecast) -> Result<Forecast, StoreError> {
        let mut tx = self.session()?.transaction()?;

        let exists = tx
            .query_opt("SELECT 1 FROM location WHERE id = $1", &[&forecast.location_id])?
            .is_some();
        if !exists {
            // Dropping the transaction rolls it back; nothing was written.
            return Err(StoreError::LocationNotFound(forecast.location_id));
        }

        let row = tx.query_one(
            INSERT_FORECAST,
            &[
                &forecast.location_id,
                &forecast.start_date,
                &forecast.end_date,
                &forecast.temperature,
                &forecast.humidity,
            ],
        )?;
        tx.commit()?;

        Ok(Forecast {
            id: row.get(0),
            location_id: forecast.location_id,
            start_date: forecast.start_date.clone(),
            end_date: forecast.end_date.clone(),
            temperature: forecast.temperature,
            humidity: forecast.humidity,
        })
    }

    fn insert_forecasts(
        &mut self,
        location_id: i32,
        records: &[ForecastRecord],
    ) -> Result<usize, StoreError> {
        let mut tx = self.session()?.transaction()?;

        if tx
            .query_opt("SELECT 1 FROM location WHERE id = $1", &[&location_id])?
            .is_none()
        {
            return Err(StoreError::LocationNotFound(location_id));
        }

        let statement = tx.prepare(INSERT_FORECAST)?;
        for record in records {
            tx.query_one(
                &statement,
                &[
                    &location_id,
                    &record.start_date,
                    &record.end_date,
                    &record.temperature,
                    &record.humidity,
                ],
            )?;
        }
        tx.commit()?;

        Ok(records.len())
    }

    fn list_locations(&mut self) -> Result<Vec<Location>, StoreError> {
        let rows = self
            .session()?
            .query("SELECT id, latitude, longitude FROM location ORDER BY id", &[])?;
        Ok(rows.iter().map(location_from_row).collect())
    }

    fn list_forecasts_by_start_date_desc(&mut self) -> Result<Vec<Forecast>, StoreError> {
        let sql = format!("{} ORDER BY start_date DESC, id ASC", SELECT_FORECAST);
        let rows = self.session()?.query(sql.as_str(), &[])?;
        Ok(rows.iter().map(forecast_from_row).collect())
    }

    fn list_forecasts_by_metric_desc(&mut self, metric: Metric) -> Result<Vec<Forecast>, StoreError> {
        // Column names cannot be bound as parameters; the enum keeps this closed.
        let order = match metric {
            Metric::Temperature => "temperature DESC, id ASC",
            Metric::Humidity => "humidity DESC, id ASC",
        };
        let sql = format!("{} ORDER BY {}", SELECT_FORECAST, order);
        let rows = self.session()?.query(sql.as_str(), &[])?;
        Ok(rows.iter().map(forecast_from_row).collect())
    }

    fn release_session(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!("database session released");
        }
    }
}
