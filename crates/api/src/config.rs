//! Application configuration loaded from environment variables.

use std::time::Duration;

use workflow::EngineConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `FLIGHT_TABLE` — seat store table reference (default: `"flights"`)
/// - `BOOKING_TABLE` — booking table reference (default: `"bookings"`)
/// - `REMOTE_TIMEOUT_MS` — workflow step timeout in ms (default: `30000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub flight_table: String,
    pub booking_table: String,
    pub remote_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            flight_table: std::env::var("FLIGHT_TABLE").unwrap_or_else(|_| "flights".to_string()),
            booking_table: std::env::var("BOOKING_TABLE")
                .unwrap_or_else(|_| "bookings".to_string()),
            remote_timeout: std::env::var("REMOTE_TIMEOUT_MS")
                .ok()
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_secs(30)),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the workflow engine configuration slice of this config.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            flight_table: self.flight_table.clone(),
            booking_table: self.booking_table.clone(),
            remote_timeout: self.remote_timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            flight_table: "flights".to_string(),
            booking_table: "bookings".to_string(),
            remote_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.flight_table, "flights");
        assert_eq!(config.remote_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_engine_config_mapping() {
        let config = Config {
            flight_table: "flights_test".to_string(),
            booking_table: "bookings_test".to_string(),
            remote_timeout: Duration::from_millis(500),
            ..Config::default()
        };
        let engine = config.engine_config();
        assert_eq!(engine.flight_table, "flights_test");
        assert_eq!(engine.booking_table, "bookings_test");
        assert_eq!(engine.remote_timeout, Duration::from_millis(500));
    }
}
