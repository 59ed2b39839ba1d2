//! Error types, one enum per concern.

use thiserror::Error;

/// Unknown ranking metric in a top-N query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricError {
    #[error("Invalid metric: {0}. Valid metrics are temperature, humidity")]
    Invalid(String),
}

/// Failures talking to the upstream forecast provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider returned HTTP {0}")]
    Status(u16),

    #[error("Provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider response could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures in the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The referenced location does not exist; nothing was written.
    #[error("Location not found")]
    LocationNotFound(i32),

    #[error("Database error: {0}")]
    Database(#[from] postgres::Error),
}

/// Failures while aggregating stored forecasts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregateError {
    /// A stored timestamp did not match `YYYY-MM-DDTHH:MM:SSZ`.
    #[error("Malformed start_date '{value}' on forecast {forecast_id}: {reason}")]
    MalformedTimestamp {
        forecast_id: i32,
        value: String,
        reason: String,
    },
}

/// Failures loading service configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("{0} environment variable not set")]
    MissingVar(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failures starting the HTTP endpoint.
#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("Failed to bind HTTP server on {addr}: {reason}")]
    Bind { addr: String, reason: String },
}
