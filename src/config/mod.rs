//! Configuration module for the template engine.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default distance between equipment placed by the grid layout.
pub const DEFAULT_GRID_SPACING: f64 = 2.0;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Grid spacing used when applying equipment packages
    pub grid_spacing: f64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("AVT_DB_PATH")
            .unwrap_or_else(|_| "./data/templates.sqlite".to_string())
            .into();

        let index_path = env::var("AVT_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let bind_addr = env::var("AVT_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid AVT_BIND_ADDR format");

        let log_level = env::var("AVT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = env::var("AVT_LOG_JSON")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let grid_spacing = parse_grid_spacing(env::var("AVT_GRID_SPACING").ok().as_deref());

        Self {
            db_path,
            index_path,
            bind_addr,
            log_level,
            log_json,
            grid_spacing,
        }
    }
}

/// Spacing must be a positive finite number; anything else falls back to the default.
fn parse_grid_spacing(raw: Option<&str>) -> f64 {
    match raw.map(str::parse::<f64>) {
        Some(Ok(v)) if v.is_finite() && v > 0.0 => v,
        Some(_) => {
            tracing::warn!(
                "Ignoring invalid AVT_GRID_SPACING, using {}",
                DEFAULT_GRID_SPACING
            );
            DEFAULT_GRID_SPACING
        }
        None => DEFAULT_GRID_SPACING,
    }
}
