//! Runtime configuration from environment variables.
//!
//! Every knob has a default so a bare `cargo run` starts an in-memory server
//! on port 3000. A `.env` file is loaded first when present.

use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_COLUMN_FLUSH_INTERVAL_MS: u64 = 100;
const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT: {0}")]
    InvalidPort(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// `None` selects in-memory storage.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Delay between dirty-column flush passes.
    pub column_flush_interval: Duration,
    /// Outbound queue depth per websocket connection.
    pub client_channel_capacity: usize,
    /// In-memory mode only: accept any token and any project.
    pub dev_open_access: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            column_flush_interval: Duration::from_millis(DEFAULT_COLUMN_FLUSH_INTERVAL_MS),
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
            dev_open_access: false,
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPort`] when `PORT` is set but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            column_flush_interval: Duration::from_millis(env_parse(
                "COLUMN_FLUSH_INTERVAL_MS",
                DEFAULT_COLUMN_FLUSH_INTERVAL_MS,
            )),
            client_channel_capacity: env_parse("CLIENT_CHANNEL_CAPACITY", DEFAULT_CLIENT_CHANNEL_CAPACITY).max(1),
            dev_open_access: env_bool("DEV_OPEN_ACCESS").unwrap_or(false),
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|raw| parse_bool(&raw))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
