//! Configuration loader for the `carewatch-dashboard` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::FixedOffset;

use crate::aggregate::HourClock;

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable, treating empty as unset.
macro_rules! optional_env {
    ($var_name:expr) => {
        env::var($var_name).ok().filter(|v| !v.trim().is_empty())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// JSON file holding the situation records.
    pub memory_file: PathBuf,

    /// Upstream situation API. Takes precedence over `memory_file` when set.
    pub api_url: Option<String>,

    /// Interval between source refreshes.
    pub refresh_interval: Duration,

    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// PostgreSQL connection string for review persistence.
    pub db_url: Option<String>,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Fixed UTC offset for heatmap hours; host local time when unset.
    pub heatmap_offset: Option<FixedOffset>,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `MEMORY_FILE` – situation file (default: `data/memory.json`)
/// - `SENSOR_API_URL` – upstream situation API
/// - `REFRESH_INTERVAL_SECS` – source poll interval (default: 10)
/// - `BIND_ADDR` – listen address (default: `0.0.0.0:8080`)
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `HEATMAP_UTC_OFFSET_MINUTES` – fixed offset for heatmap hours
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let memory_file = optional_env!("MEMORY_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/memory.json"));
    let api_url = optional_env!("SENSOR_API_URL");
    let db_url = optional_env!("DATABASE_URL");
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);

    let refresh_secs = parse_env_u32!("REFRESH_INTERVAL_SECS", 10);
    if refresh_secs == 0 {
        return Err(anyhow!("REFRESH_INTERVAL_SECS must be greater than zero"));
    }

    let bind_addr = optional_env!("BIND_ADDR")
        .unwrap_or_else(|| "0.0.0.0:8080".to_string())
        .parse::<SocketAddr>()
        .map_err(|e| anyhow!("Invalid BIND_ADDR: {}", e))?;

    let heatmap_offset = optional_env!("HEATMAP_UTC_OFFSET_MINUTES")
        .map(|v| parse_offset_minutes(&v))
        .transpose()?;

    Ok(Config {
        memory_file,
        api_url,
        refresh_interval: Duration::from_secs(u64::from(refresh_secs)),
        bind_addr,
        db_url,
        db_pool_max,
        heatmap_offset,
    })
}

fn parse_offset_minutes(value: &str) -> Result<FixedOffset> {
    // ---
    let minutes = value
        .trim()
        .parse::<i32>()
        .map_err(|e| anyhow!("Invalid HEATMAP_UTC_OFFSET_MINUTES: {}", e))?;
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| anyhow!("HEATMAP_UTC_OFFSET_MINUTES out of range: {}", minutes))
}

/// Mask the password in a database URL for logging.
fn mask_db_url(db_url: &str) -> String {
    // ---
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            // `postgres://host@...` has no password; the colon is the scheme's.
            if !db_url[colon_pos..].starts_with("://") {
                return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
            }
        }
    }
    db_url.to_string()
}

impl Config {
    /// Wall clock for the activity heatmap.
    pub fn hour_clock(&self) -> HourClock {
        self.heatmap_offset.map_or(HourClock::Local, HourClock::Fixed)
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords while showing
    /// all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        let masked_db_url = self
            .db_url
            .as_deref()
            .map_or_else(|| "(unset, reviews kept in memory)".to_string(), mask_db_url);

        tracing::info!("Configuration loaded:");
        tracing::info!("  MEMORY_FILE        : {}", self.memory_file.display());
        tracing::info!(
            "  SENSOR_API_URL     : {}",
            self.api_url.as_deref().unwrap_or("(unset)")
        );
        tracing::info!("  REFRESH_INTERVAL   : {:?}", self.refresh_interval);
        tracing::info!("  BIND_ADDR          : {}", self.bind_addr);
        tracing::info!("  DATABASE_URL       : {}", masked_db_url);
        tracing::info!("  DB_POOL_MAX        : {}", self.db_pool_max);
        tracing::info!("  HEATMAP_CLOCK      : {:?}", self.hour_clock());
    }
}
