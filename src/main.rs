//! Forecast Service - HTTP server
//!
//! Serves the forecast API:
//! 1. Proxies live 7-day forecasts from Meteomatics
//! 2. Stores forecasts for the configured seed locations on request
//! 3. Answers latest-per-day, rolling-average and top-N queries
//!
//! Usage:
//!   cargo run --release                          # Serve on port 8000 backed by PostgreSQL
//!   cargo run --release -- --port 9000           # Serve on another port
//!   cargo run --release -- --config other.toml   # Use another config file
//!   cargo run --release -- --memory              # Keep everything in memory (no database)
//!
//! Environment:
//!   DATABASE_URL               - PostgreSQL connection string
//!   METEOMATICS_API_USERNAME   - Meteomatics account name
//!   METEOMATICS_API_PASSWORD   - Meteomatics password
//!   RUST_LOG                   - log filter (default: info)

use forecast_service::config::{ServiceConfig, DEFAULT_CONFIG_PATH};
use forecast_service::db;
use forecast_service::endpoint::{self, ForecastApi};
use forecast_service::ingest::meteomatics::MeteomaticsClient;
use forecast_service::store::{ForecastStore, MemoryStore, PgStore};
use std::env;
use std::path::PathBuf;
use std::process;

#[derive(Debug)]
struct Args {
    port: Option<u16>,
    config_path: PathBuf,
    memory: bool,
}

fn usage(program: &str) -> String {
    format!("Usage: {} [--port PORT] [--config PATH] [--memory]", program)
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let program = args.first().map(String::as_str).unwrap_or("forecast_service");
    let mut parsed = Args {
        port: None,
        config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        memory: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| "--port requires a port number".to_string())?;
                parsed.port = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid port number: {}", value))?,
                );
                i += 2;
            }
            "--config" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| "--config requires a file path".to_string())?;
                parsed.config_path = PathBuf::from(value);
                i += 2;
            }
            "--memory" => {
                parsed.memory = true;
                i += 1;
            }
            other => {
                return Err(format!("Unknown argument: {}\n{}", other, usage(program)));
            }
        }
    }

    Ok(parsed)
}

fn serve<S: ForecastStore>(store: S, config: ServiceConfig, port: u16) {
    let client = match MeteomaticsClient::new(config.provider.clone()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("❌ Failed to build provider client: {}", e);
            process::exit(1);
        }
    };

    let api = ForecastApi::new(store, client, config.seed_locations.clone(), config.forecast_days);

    println!("🚀 Starting HTTP endpoint on http://0.0.0.0:{}\n", port);
    if let Err(e) = endpoint::start_endpoint_server(port, api, &config.server.allowed_origins) {
        eprintln!("❌ Endpoint server error: {}", e);
        process::exit(1);
    }
}

fn main() {
    forecast_service::init_tracing();

    println!("🌤  Forecast Service");
    println!("===================\n");

    let args: Vec<String> = env::args().collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let config = match ServiceConfig::load(&args.config_path, !args.memory) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Configuration error: {}\n", e);
            process::exit(1);
        }
    };
    let port = args.port.unwrap_or(config.server.port);

    println!("📋 Provider: {} (model {})", config.provider.base_url, config.provider.model);
    println!("   Seed locations: {}", config.seed_locations.len());
    println!("   Forecast window: {} days\n", config.forecast_days);

    if args.memory {
        println!("📊 Using in-memory store (data is lost on exit)\n");
        serve(MemoryStore::new(), config, port);
        return;
    }

    let Some(database_url) = config.database_url.clone() else {
        eprintln!("\n❌ DATABASE_URL must be set unless --memory is given\n");
        process::exit(1);
    };

    println!("📊 Connecting to database...");
    let client = match db::connect_and_prepare(&database_url) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("\n❌ {}\n", e);
            process::exit(1);
        }
    };
    println!("✓ Database ready\n");

    serve(PgStore::with_session(database_url, client), config, port);
}
