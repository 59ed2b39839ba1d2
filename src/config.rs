/// Service configuration loader.
///
/// Secrets come from the environment (optionally via `.env`); everything
/// else has a built-in default that `forecast.toml` may override. The
/// resulting `ServiceConfig` is constructed once at startup and handed to
/// the components that need it.

use serde::Deserialize;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "forecast.toml";
pub const DEFAULT_PROVIDER_URL: &str = "https://api.meteomatics.com";
pub const DEFAULT_PROVIDER_MODEL: &str = "mix";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_FORECAST_DAYS: u32 = 7;

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_PROVIDER_USERNAME: &str = "METEOMATICS_API_USERNAME";
pub const ENV_PROVIDER_PASSWORD: &str = "METEOMATICS_API_PASSWORD";

/// Coordinates fetched by `POST /forecast/saveForecastData` when the
/// config file names none: Athens, Thessaloniki, Nicosia.
pub const DEFAULT_SEED_LOCATIONS: [(f64, f64); 3] = [
    (37.983810, 23.727539),
    (40.629269, 22.947412),
    (34.923096, 33.634045),
];

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 4] = [
    "http://127.0.0.1:8000/",
    "http://127.0.0.1",
    "http://localhost",
    "http://localhost:8000",
];

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Upstream provider access.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    pub username: String,
    pub password: String,
}

/// HTTP endpoint settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

/// Everything the service needs, resolved once at process start.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// `None` only when running against the in-memory store.
    pub database_url: Option<String>,
    pub provider: ProviderConfig,
    pub server: ServerConfig,
    /// Length of the fetch window, counting today.
    pub forecast_days: u32,
    pub seed_locations: Vec<(f64, f64)>,
}

// ---------------------------------------------------------------------------
// File layout (forecast.toml)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    provider: ProviderSection,
    forecast_days: Option<u32>,
    #[serde(default)]
    seed_location: Vec<SeedLocation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerSection {
    port: Option<u16>,
    allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProviderSection {
    base_url: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedLocation {
    latitude: f64,
    longitude: f64,
}

impl ServiceConfig {
    /// Loads `.env`, then the config file at `path` (if it exists), then the
    /// required environment variables.
    ///
    /// `require_database` is false for the in-memory run mode, where a
    /// missing `DATABASE_URL` is not an error.
    pub fn load(path: &Path, require_database: bool) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let contents = match fs::read_to_string(path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                None
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        Self::from_parts(
            contents.as_deref(),
            &path.display().to_string(),
            |key| env::var(key).ok(),
            require_database,
        )
    }

    /// Builds a config from optional TOML text and an environment lookup.
    pub fn from_parts<F>(
        toml_text: Option<&str>,
        origin: &str,
        lookup: F,
        require_database: bool,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = match toml_text {
            Some(text) => toml::from_str(text).map_err(|source| ConfigError::Parse {
                path: origin.to_string(),
                source,
            })?,
            None => FileConfig::default(),
        };

        let database_url = lookup(ENV_DATABASE_URL).filter(|v| !v.is_empty());
        if require_database && database_url.is_none() {
            return Err(ConfigError::MissingVar(ENV_DATABASE_URL));
        }

        let username = lookup(ENV_PROVIDER_USERNAME)
            .ok_or(ConfigError::MissingVar(ENV_PROVIDER_USERNAME))?;
        let password = lookup(ENV_PROVIDER_PASSWORD)
            .ok_or(ConfigError::MissingVar(ENV_PROVIDER_PASSWORD))?;

        let forecast_days = file.forecast_days.unwrap_or(DEFAULT_FORECAST_DAYS);
        if forecast_days == 0 {
            return Err(ConfigError::Invalid("forecast_days must be at least 1".into()));
        }

        let seed_locations = if file.seed_location.is_empty() {
            DEFAULT_SEED_LOCATIONS.to_vec()
        } else {
            file.seed_location
                .iter()
                .map(|s| (s.latitude, s.longitude))
                .collect()
        };

        for &(lat, lon) in &seed_locations {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(ConfigError::Invalid(format!(
                    "seed location ({}, {}) is out of range",
                    lat, lon
                )));
            }
        }

        Ok(ServiceConfig {
            database_url,
            provider: ProviderConfig {
                base_url: file
                    .provider
                    .base_url
                    .unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                model: file
                    .provider
                    .model
                    .unwrap_or_else(|| DEFAULT_PROVIDER_MODEL.to_string()),
                username,
                password,
            },
            server: ServerConfig {
                port: file.server.port.unwrap_or(DEFAULT_PORT),
                allowed_origins: file.server.allowed_origins.unwrap_or_else(|| {
                    DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect()
                }),
            },
            forecast_days,
            seed_locations,
        })
    }
}
