//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use crate::error::AppError;
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub parking: ParkingConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Comma-separated list of allowed CORS origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_timeout() -> u64 {
    30
}

fn default_cors_origins() -> String {
    "http://localhost:3000,http://127.0.0.1:3000".to_string()
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply pending migrations on startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_run_migrations() -> bool {
    true
}

/// Parking lot behaviour
#[derive(Debug, Deserialize, Clone)]
pub struct ParkingConfig {
    /// IANA timezone used for ticket codes and displayed timestamps
    #[serde(default = "default_display_timezone")]
    pub display_timezone: String,

    /// `strftime` pattern for displayed timestamps
    #[serde(default = "default_display_datetime_format")]
    pub display_datetime_format: String,

    /// Minimum charge hours applied when a rate config omits it
    #[serde(default = "default_minimum_charge_hours")]
    pub default_minimum_charge_hours: i32,
}

fn default_display_timezone() -> String {
    "UTC".to_string()
}

fn default_display_datetime_format() -> String {
    "%Y-%m-%d %H:%M".to_string()
}

fn default_minimum_charge_hours() -> i32 {
    1
}

impl Default for ParkingConfig {
    fn default() -> Self {
        Self {
            display_timezone: default_display_timezone(),
            display_datetime_format: default_display_datetime_format(),
            default_minimum_charge_hours: default_minimum_charge_hours(),
        }
    }
}

impl ParkingConfig {
    /// Resolve the configured display timezone
    pub fn timezone(&self) -> Result<Tz, AppError> {
        self.display_timezone.parse::<Tz>().map_err(|_| {
            AppError::Config(format!(
                "Unknown display timezone: {}",
                self.display_timezone
            ))
        })
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("server.timeout_secs", 30)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.run_migrations", true)?
            .set_default("parking.display_timezone", "UTC")?
            .set_default("parking.display_datetime_format", "%Y-%m-%d %H:%M")?
            .set_default("parking.default_minimum_charge_hours", 1)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with PARKING_ prefix
            .add_source(
                Environment::with_prefix("PARKING")
                    .separator("__")
                    .try_parsing(true),
            )
            // Plain DATABASE_URL wins over everything, matching sqlx tooling
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("PARKING").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
