/// HTTP endpoint for the forecast service
///
/// Provides a small REST API over the provider client, the store and the
/// aggregate queries.
///
/// Endpoints:
/// - GET  /                              - Health check
/// - GET  /forecast                      - Live 7-day fetch for one coordinate (not stored)
/// - POST /forecast/saveLocation         - Find or create a location
/// - POST /forecast/saveForecast         - Store one forecast for an existing location
/// - POST /forecast/saveForecastData     - Fetch and store forecasts for the seed locations
/// - GET  /forecast/listLocations        - All stored locations
/// - GET  /forecast/latestForecasts      - Latest forecast per location per day
/// - GET  /forecast/averageTemperature   - Rolling average temperature per location per day
/// - GET  /forecast/topLocations         - Top-N locations by metric
///
/// Routing and handling are plain functions over `(method, url, body)` so
/// they can be tested without a socket; `start_endpoint_server` wires them
/// to tiny_http.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::analysis::aggregates;
use crate::error::{AggregateError, EndpointError, StoreError};
use crate::ingest::meteomatics::{forecast_window, ForecastSource};
use crate::model::{Location, Metric, NewForecast};
use crate::store::{find_or_create_location, ForecastStore};

const AVAILABLE_ENDPOINTS: [&str; 9] = [
    "GET /",
    "GET /forecast",
    "POST /forecast/saveLocation",
    "POST /forecast/saveForecast",
    "POST /forecast/saveForecastData",
    "GET /forecast/listLocations",
    "GET /forecast/latestForecasts",
    "GET /forecast/averageTemperature",
    "GET /forecast/topLocations",
];

const CORS_ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE";

// ---------------------------------------------------------------------------
// Response type
// ---------------------------------------------------------------------------

/// Status code and optional JSON body produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ApiResponse {
    pub fn ok<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(body) => Self::json(200, body),
            Err(e) => Self::error(500, format!("Failed to serialize response: {}", e)),
        }
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, json!({ "error": message.into() }))
    }

    /// Client-side rejection (bad method, parameters or body).
    pub fn detail(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, json!({ "detail": message.into() }))
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Query parsing
// ---------------------------------------------------------------------------

/// Splits a request URL into a normalized path (no trailing slash) and its
/// decoded query parameters.
pub fn split_url(url: &str) -> (String, HashMap<String, String>) {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    let trimmed = path.trim_end_matches('/');
    let path = if trimmed.is_empty() { "/" } else { trimmed };

    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect();

    (path.to_string(), params)
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

fn required_param<'a>(params: &'a HashMap<String, String>, name: &str) -> Result<&'a str, String> {
    params
        .get(name)
        .map(|s| s.as_str())
        .ok_or_else(|| format!("Missing required query parameter '{}'", name))
}

fn bounded_param(params: &HashMap<String, String>, name: &str, limit: f64) -> Result<f64, String> {
    let raw = required_param(params, name)?;
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("Query parameter '{}' must be a number, got '{}'", name, raw))?;
    if !value.is_finite() || value < -limit || value > limit {
        return Err(format!("{} must be between {} and {}", name, -limit, limit));
    }
    Ok(value)
}

/// Latitude/longitude query parameters, range-checked.
pub fn parse_coordinates(params: &HashMap<String, String>) -> Result<(f64, f64), String> {
    let latitude = bounded_param(params, "latitude", 90.0)?;
    let longitude = bounded_param(params, "longitude", 180.0)?;
    Ok((latitude, longitude))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Request handler state: the store, the provider, and the settings for
/// the bulk save.
pub struct ForecastApi<S, P> {
    store: S,
    source: P,
    seed_locations: Vec<(f64, f64)>,
    forecast_days: u32,
}

impl<S: ForecastStore, P: ForecastSource> ForecastApi<S, P> {
    pub fn new(store: S, source: P, seed_locations: Vec<(f64, f64)>, forecast_days: u32) -> Self {
        Self {
            store,
            source,
            seed_locations,
            forecast_days,
        }
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Routes one request and produces its response.
    pub fn handle(&mut self, method: &Method, url: &str, body: &str) -> ApiResponse {
        let (path, params) = split_url(url);

        if *method == Method::Options {
            return ApiResponse::no_content();
        }

        let response = match (method, path.as_str()) {
            (Method::Get, "/") => ApiResponse::json(200, json!({ "message": "The API is healthy" })),
            (Method::Get, "/forecast") => self.get_forecast(&params),
            (Method::Post, "/forecast/saveLocation") => self.save_location(&params),
            (Method::Post, "/forecast/saveForecast") => self.save_forecast(body),
            (Method::Post, "/forecast/saveForecastData") => self.save_forecast_data(),
            (Method::Get, "/forecast/listLocations") => self.list_locations(),
            (Method::Get, "/forecast/latestForecasts") => self.latest_forecasts(),
            (Method::Get, "/forecast/averageTemperature") => self.average_temperature(),
            (Method::Get, "/forecast/topLocations") => self.top_locations(&params),
            (_, p) if is_known_path(p) => ApiResponse::detail(405, "Method Not Allowed"),
            _ => ApiResponse::json(
                404,
                json!({
                    "error": "Not found",
                    "available_endpoints": AVAILABLE_ENDPOINTS,
                }),
            ),
        };

        self.store.release_session();

        tracing::info!(method = %method, path = %path, status = response.status, "request handled");
        response
    }

    fn window(&self) -> (NaiveDate, NaiveDate) {
        forecast_window(Local::now().date_naive(), self.forecast_days)
    }

    /// GET /forecast
    fn get_forecast(&mut self, params: &HashMap<String, String>) -> ApiResponse {
        let (latitude, longitude) = match parse_coordinates(params) {
            Ok(coords) => coords,
            Err(e) => return ApiResponse::detail(422, e),
        };
        let (start, end) = self.window();
        let results = self.source.fetch_many(start, end, &[(latitude, longitude)]);
        ApiResponse::ok(&results)
    }

    /// POST /forecast/saveLocation
    fn save_location(&mut self, params: &HashMap<String, String>) -> ApiResponse {
        let (latitude, longitude) = match parse_coordinates(params) {
            Ok(coords) => coords,
            Err(e) => return ApiResponse::detail(422, e),
        };
        match find_or_create_location(&mut self.store, latitude, longitude) {
            Ok(location) => ApiResponse::ok(&location),
            Err(e) => store_failure(e),
        }
    }

    /// POST /forecast/saveForecast
    fn save_forecast(&mut self, body: &str) -> ApiResponse {
        let new_forecast: NewForecast = match serde_json::from_str(body) {
            Ok(f) => f,
            Err(e) => return ApiResponse::detail(422, format!("Invalid forecast body: {}", e)),
        };
        match self.store.create_forecast(&new_forecast) {
            Ok(forecast) => ApiResponse::ok(&forecast),
            Err(StoreError::LocationNotFound(id)) => {
                tracing::info!(location_id = id, "rejected forecast for unknown location");
                ApiResponse::error(404, "Location not found")
            }
            Err(e) => store_failure(e),
        }
    }

    /// POST /forecast/saveForecastData
    fn save_forecast_data(&mut self) -> ApiResponse {
        let (start, end) = self.window();
        let fetched = self.source.fetch_many(start, end, &self.seed_locations);

        let mut locations_saved = 0usize;
        let mut forecasts_saved = 0usize;

        for (entry, &(latitude, longitude)) in fetched.iter().zip(&self.seed_locations) {
            let Some(data) = entry else {
                tracing::warn!(latitude, longitude, "no provider data, skipping location");
                continue;
            };

            let location = match self
                .store
                .find_location_by_exact_coordinate(data.latitude, data.longitude)
            {
                Ok(Some(existing)) => existing,
                Ok(None) => match self.store.create_location(data.latitude, data.longitude) {
                    Ok(created) => created,
                    Err(e) => return store_failure(e),
                },
                Err(e) => return store_failure(e),
            };

            match self.store.insert_forecasts(location.id, &data.forecasts) {
                Ok(count) => {
                    locations_saved += 1;
                    forecasts_saved += count;
                }
                Err(e) => return store_failure(e),
            }
        }

        tracing::info!(locations_saved, forecasts_saved, "forecast data saved");
        ApiResponse::json(
            200,
            json!({
                "message": "Forecast data saved successfully",
                "locations_saved": locations_saved,
                "forecasts_saved": forecasts_saved,
            }),
        )
    }

    /// GET /forecast/listLocations
    fn list_locations(&mut self) -> ApiResponse {
        match self.store.list_locations() {
            Ok(locations) => ApiResponse::ok(&locations),
            Err(e) => store_failure(e),
        }
    }

    /// GET /forecast/latestForecasts
    fn latest_forecasts(&mut self) -> ApiResponse {
        let forecasts = match self.store.list_forecasts_by_start_date_desc() {
            Ok(f) => f,
            Err(e) => return store_failure(e),
        };
        match aggregates::latest_per_day(&forecasts) {
            Ok(latest) => ApiResponse::ok(&latest),
            Err(e) => aggregate_failure(e),
        }
    }

    /// GET /forecast/averageTemperature
    fn average_temperature(&mut self) -> ApiResponse {
        let forecasts = match self.store.list_forecasts_by_start_date_desc() {
            Ok(f) => f,
            Err(e) => return store_failure(e),
        };
        match aggregates::rolling_averages(&forecasts) {
            Ok(averages) => ApiResponse::ok(&averages),
            Err(e) => aggregate_failure(e),
        }
    }

    /// GET /forecast/topLocations?metric=&n=
    fn top_locations(&mut self, params: &HashMap<String, String>) -> ApiResponse {
        let (metric_name, n) = match (required_param(params, "metric"), required_param(params, "n")) {
            (Ok(metric), Ok(n)) => (metric, n),
            (Err(e), _) | (_, Err(e)) => return ApiResponse::detail(422, e),
        };
        let n: usize = match n.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                return ApiResponse::detail(
                    422,
                    format!("Query parameter 'n' must be a non-negative integer, got '{}'", n),
                );
            }
        };
        let metric: Metric = match metric_name.parse() {
            Ok(m) => m,
            Err(e) => return ApiResponse::detail(400, e.to_string()),
        };

        let forecasts = match self.store.list_forecasts_by_metric_desc(metric) {
            Ok(f) => f,
            Err(e) => return store_failure(e),
        };
        let locations: HashMap<i32, Location> = match self.store.list_locations() {
            Ok(list) => list.into_iter().map(|l| (l.id, l)).collect(),
            Err(e) => return store_failure(e),
        };

        ApiResponse::ok(&aggregates::top_locations(&forecasts, &locations, metric, n))
    }
}

fn is_known_path(path: &str) -> bool {
    AVAILABLE_ENDPOINTS
        .iter()
        .any(|e| e.split_once(' ').is_some_and(|(_, p)| p == path))
}

fn store_failure(e: StoreError) -> ApiResponse {
    tracing::error!(error = %e, "store operation failed");
    ApiResponse::error(500, e.to_string())
}

fn aggregate_failure(e: AggregateError) -> ApiResponse {
    tracing::error!(error = %e, "stored forecast data is malformed");
    ApiResponse::error(500, e.to_string())
}

// ---------------------------------------------------------------------------
// CORS
// ---------------------------------------------------------------------------

/// Extra headers for a response to a request from `origin`. Empty unless
/// the origin is allowed.
pub fn cors_headers(
    origin: Option<&str>,
    allowed_origins: &[String],
    method: &Method,
    requested_headers: Option<&str>,
) -> Vec<(String, String)> {
    let Some(origin) = origin.filter(|o| allowed_origins.iter().any(|a| a.as_str() == *o)) else {
        return Vec::new();
    };

    let mut headers = vec![
        ("Access-Control-Allow-Origin".to_string(), origin.to_string()),
        ("Access-Control-Allow-Credentials".to_string(), "true".to_string()),
        ("Vary".to_string(), "Origin".to_string()),
    ];
    if *method == Method::Options {
        headers.push((
            "Access-Control-Allow-Methods".to_string(),
            CORS_ALLOWED_METHODS.to_string(),
        ));
        headers.push((
            "Access-Control-Allow-Headers".to_string(),
            requested_headers.unwrap_or("*").to_string(),
        ));
    }
    headers
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Start HTTP endpoint server on the specified port. Requests are handled
/// one at a time, each against the same store handle.
pub fn start_endpoint_server<S, P>(
    port: u16,
    mut api: ForecastApi<S, P>,
    allowed_origins: &[String],
) -> Result<(), EndpointError>
where
    S: ForecastStore,
    P: ForecastSource,
{
    let addr = format!("0.0.0.0:{}", port);
    let server = tiny_http::Server::http(&addr).map_err(|e| EndpointError::Bind {
        addr: addr.clone(),
        reason: e.to_string(),
    })?;

    tracing::info!(%addr, "HTTP endpoint listening");
    for endpoint in AVAILABLE_ENDPOINTS {
        tracing::info!("   {}", endpoint);
    }

    for request in server.incoming_requests() {
        serve_request(&mut api, request, allowed_origins);
    }

    Ok(())
}

fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_string())
}

fn serve_request<S, P>(api: &mut ForecastApi<S, P>, mut request: Request, allowed_origins: &[String])
where
    S: ForecastStore,
    P: ForecastSource,
{
    let mut body = String::new();
    if let Err(e) = request.as_reader().read_to_string(&mut body) {
        tracing::warn!(error = %e, "failed to read request body");
        let response = create_response(&ApiResponse::detail(400, "Unreadable request body"), &[]);
        if let Err(e) = request.respond(response) {
            tracing::warn!(error = %e, "failed to send response");
        }
        return;
    }

    let method = request.method().clone();
    let url = request.url().to_string();
    let origin = header_value(&request, "Origin");
    let requested_headers = header_value(&request, "Access-Control-Request-Headers");

    let api_response = api.handle(&method, &url, &body);
    let extra = cors_headers(
        origin.as_deref(),
        allowed_origins,
        &method,
        requested_headers.as_deref(),
    );

    if let Err(e) = request.respond(create_response(&api_response, &extra)) {
        tracing::warn!(error = %e, "failed to send response");
    }
}

/// Create HTTP response with JSON body
fn create_response(api_response: &ApiResponse, extra_headers: &[(String, String)]) -> Response<Cursor<Vec<u8>>> {
    let bytes = api_response
        .body
        .as_ref()
        .map(|body| serde_json::to_vec_pretty(body).unwrap_or_default())
        .unwrap_or_default();

    let mut response = Response::from_data(bytes).with_status_code(StatusCode(api_response.status));

    if api_response.body.is_some() {
        if let Ok(h) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
            response = response.with_header(h);
        }
    }
    for (name, value) in extra_headers {
        if let Ok(h) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            response = response.with_header(h);
        }
    }
    response
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
