/// Integration tests for the PostgreSQL store.
///
/// Prerequisites:
/// - PostgreSQL running
/// - DATABASE_URL set in .env (the schema is created if absent)
///
/// Each test works on its own coordinates so runs do not interfere.
///
/// Run with: cargo test --test postgres_store -- --ignored --test-threads=1

use chrono::NaiveDate;
use forecast_service::db;
use forecast_service::endpoint::ForecastApi;
use forecast_service::ingest::meteomatics::ForecastSource;
use forecast_service::model::{ForecastRecord, LocationForecasts, Metric, NewForecast};
use forecast_service::store::{find_or_create_location, ForecastStore, PgStore};
use postgres::Client;
use std::env;
use tiny_http::Method;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn database_url() -> String {
    dotenv::dotenv().ok();
    env::var("DATABASE_URL").expect("DATABASE_URL must be set")
}

fn admin_client() -> Client {
    db::connect_and_prepare(&database_url()).expect("Failed to prepare test database")
}

fn setup_store() -> PgStore {
    let url = database_url();
    let client = admin_client();
    PgStore::with_session(url, client)
}

/// Provider that is never reachable; the session tests only touch the store.
struct NoProvider;

impl ForecastSource for NoProvider {
    fn fetch_many(&self, _: NaiveDate, _: NaiveDate, coordinates: &[(f64, f64)]) -> Vec<Option<LocationForecasts>> {
        vec![None; coordinates.len()]
    }
}

/// Kills every other backend connected to the test database.
fn terminate_other_backends(admin: &mut Client) {
    admin
        .execute(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity
             WHERE datname = current_database() AND pid <> pg_backend_pid()",
            &[],
        )
        .expect("terminate backends");
}

/// Coordinates no other test run is likely to use.
fn unique_coordinate(offset: f64) -> (f64, f64) {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    (-89.0 + offset, -179.0 + f64::from(nanos % 100_000) / 1000.0)
}

fn cleanup(location_ids: &[i32]) {
    let mut client = admin_client();
    for id in location_ids {
        let _ = client.execute("DELETE FROM forecast WHERE location_id = $1", &[id]);
        let _ = client.execute("DELETE FROM location WHERE id = $1", &[id]);
    }
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

#[test]
#[ignore] // Only run when database is available
fn test_rounded_coordinates_share_a_location() {
    let mut store = setup_store();
    let (lat, lon) = unique_coordinate(0.1);

    let first = find_or_create_location(&mut store, lat + 0.00001, lon).unwrap();
    let second = find_or_create_location(&mut store, lat + 0.00004, lon).unwrap();
    assert_eq!(first.id, second.id);

    let third = find_or_create_location(&mut store, lat + 0.0002, lon).unwrap();
    assert_ne!(first.id, third.id);

    cleanup(&[first.id, third.id]);
}

// ---------------------------------------------------------------------------
// Forecasts
// ---------------------------------------------------------------------------

#[test]
#[ignore]
fn test_forecast_for_missing_location_writes_nothing() {
    let mut store = setup_store();
    let before = store.list_forecasts_by_start_date_desc().unwrap().len();

    let result = store.create_forecast(&NewForecast {
        location_id: -1,
        start_date: "2024-05-01T00:00:00Z".to_string(),
        end_date: "2024-05-01T00:00:00Z".to_string(),
        temperature: 1.0,
        humidity: 1.0,
    });

    assert!(result.is_err());
    assert_eq!(store.list_forecasts_by_start_date_desc().unwrap().len(), before);
}

#[test]
#[ignore]
fn test_bulk_insert_and_orderings() {
    let mut store = setup_store();
    let (lat, lon) = unique_coordinate(0.2);
    let location = store.create_location(lat, lon).unwrap();

    let records: Vec<ForecastRecord> = [("1999-01-01T00:00:00Z", -40.0), ("1999-01-01T01:00:00Z", 99.5)]
        .iter()
        .map(|&(date, temperature)| ForecastRecord {
            start_date: date.to_string(),
            end_date: date.to_string(),
            temperature,
            humidity: 10.0,
        })
        .collect();
    assert_eq!(store.insert_forecasts(location.id, &records).unwrap(), 2);

    let ours: Vec<String> = store
        .list_forecasts_by_start_date_desc()
        .unwrap()
        .into_iter()
        .filter(|f| f.location_id == location.id)
        .map(|f| f.start_date)
        .collect();
    assert_eq!(ours, vec!["1999-01-01T01:00:00Z", "1999-01-01T00:00:00Z"]);

    let hottest: Vec<f64> = store
        .list_forecasts_by_metric_desc(Metric::Temperature)
        .unwrap()
        .into_iter()
        .filter(|f| f.location_id == location.id)
        .map(|f| f.temperature)
        .collect();
    assert_eq!(hottest, vec![99.5, -40.0]);

    cleanup(&[location.id]);
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[test]
#[ignore]
fn test_store_reconnects_after_backend_terminated() {
    let mut store = setup_store();
    let mut admin = admin_client();
    store.list_locations().unwrap();

    let pid: i32 = store
        .session()
        .unwrap()
        .query_one("SELECT pg_backend_pid()", &[])
        .unwrap()
        .get(0);
    admin.execute("SELECT pg_terminate_backend($1)", &[&pid]).unwrap();

    store.release_session();
    assert!(store.list_locations().is_ok());
}

#[test]
#[ignore]
fn test_requests_survive_dropped_connections() {
    let store = PgStore::new(database_url());
    let mut api = ForecastApi::new(store, NoProvider, Vec::new(), 7);
    let mut admin = admin_client();

    assert_eq!(api.handle(&Method::Get, "/forecast/listLocations", "").status, 200);

    let mut statuses = Vec::new();
    for _ in 0..3 {
        terminate_other_backends(&mut admin);
        statuses.push(api.handle(&Method::Get, "/forecast/listLocations", "").status);
    }
    assert_eq!(statuses, vec![200, 200, 200]);
}
