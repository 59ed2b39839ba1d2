/// forecast_service: weather forecast proxy and cache.
///
/// Fetches hourly temperature and humidity forecasts from the Meteomatics
/// API, stores them per location, and serves aggregate views over HTTP.
///
/// # Module structure
///
/// ```text
/// forecast_service
/// ├── model       - shared data types (Location, Forecast, Metric, …)
/// ├── error       - error enums for provider, store, aggregation and config
/// ├── config      - forecast.toml + environment loader
/// ├── db          - PostgreSQL connection and schema bootstrap
/// ├── store
/// │   ├── pg      - PostgreSQL-backed ForecastStore
/// │   └── memory  - in-process ForecastStore
/// ├── ingest
/// │   ├── meteomatics - URL construction, JSON parsing, HTTP client
/// │   └── fixtures (test only) - representative API response payloads
/// ├── analysis
/// │   └── aggregates - latest-per-day, rolling average, top-N
/// └── endpoint    - HTTP API and tiny_http server loop
/// ```

pub mod analysis;
pub mod config;
pub mod db;
pub mod endpoint;
pub mod error;
pub mod ingest;
pub mod model;
pub mod store;

/// Installs the global tracing subscriber. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
}
