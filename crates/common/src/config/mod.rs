//! Configuration management for ParkForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration (one store per service)
    pub database: DatabaseConfig,

    /// Downstream service endpoints and timeouts
    #[serde(default)]
    pub dependencies: DependenciesConfig,

    /// Slot inventory seeded by the parking service
    #[serde(default)]
    pub parking: ParkingConfig,

    /// Default tariff seeded by the tariff service
    #[serde(default)]
    pub tariff: TariffConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

/// Base URLs and timeouts for the collaborating services.
///
/// Every synchronous dependency call is bounded by `call_timeout_secs`;
/// the fire-and-forget notification path uses the shorter
/// `notify_timeout_secs` and never surfaces failures.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DependenciesConfig {
    /// Auth service base URL
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Vehicle registry base URL
    #[serde(default = "default_vehicle_url")]
    pub vehicle_url: String,

    /// Tariff engine base URL
    #[serde(default = "default_tariff_url")]
    pub tariff_url: String,

    /// Slot/session manager base URL
    #[serde(default = "default_parking_url")]
    pub parking_url: String,

    /// Notification service base URL
    #[serde(default = "default_notify_url")]
    pub notify_url: String,

    /// Timeout for blocking dependency calls, in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// Timeout for fire-and-forget notifications, in seconds
    #[serde(default = "default_notify_timeout")]
    pub notify_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParkingConfig {
    /// Number of physical slots to seed (insert-if-absent)
    #[serde(default = "default_slot_count")]
    pub slot_count: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TariffConfig {
    /// Hourly rate seeded when the tariff table is empty
    #[serde(default = "default_hourly_rate")]
    pub default_hourly_rate: f64,

    /// Free minutes seeded when the tariff table is empty
    #[serde(default = "default_free_minutes")]
    pub default_free_minutes: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 50 }
fn default_min_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_auth_url() -> String { "http://localhost:5001".to_string() }
fn default_vehicle_url() -> String { "http://localhost:5002".to_string() }
fn default_parking_url() -> String { "http://localhost:5003".to_string() }
fn default_tariff_url() -> String { "http://localhost:5011".to_string() }
fn default_notify_url() -> String { "http://localhost:5012".to_string() }
fn default_call_timeout() -> u64 { 5 }
fn default_notify_timeout() -> u64 { 2 }
fn default_slot_count() -> u32 { 20 }
fn default_hourly_rate() -> f64 { 30.0 }
fn default_free_minutes() -> i32 { 2 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "parkforge".to_string() }

impl Default for DependenciesConfig {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            vehicle_url: default_vehicle_url(),
            tariff_url: default_tariff_url(),
            parking_url: default_parking_url(),
            notify_url: default_notify_url(),
            call_timeout_secs: default_call_timeout(),
            notify_timeout_secs: default_notify_timeout(),
        }
    }
}

impl Default for ParkingConfig {
    fn default() -> Self {
        Self {
            slot_count: default_slot_count(),
        }
    }
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            default_hourly_rate: default_hourly_rate(),
            default_free_minutes: default_free_minutes(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }
}

impl DependenciesConfig {
    /// Bound for blocking dependency calls
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Bound for fire-and-forget notifications
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/parkforge".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            dependencies: DependenciesConfig::default(),
            parking: ParkingConfig::default(),
            tariff: TariffConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.parking.slot_count, 20);
        assert_eq!(config.tariff.default_hourly_rate, 30.0);
        assert_eq!(config.tariff.default_free_minutes, 2);
    }

    #[test]
    fn test_dependency_timeouts() {
        let deps = DependenciesConfig::default();
        assert_eq!(deps.call_timeout(), Duration::from_secs(5));
        assert_eq!(deps.notify_timeout(), Duration::from_secs(2));
        // Notifications must never block longer than a blocking call would
        assert!(deps.notify_timeout() <= deps.call_timeout());
    }

    #[test]
    fn test_read_database_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.read_database_url(), "postgres://localhost/parkforge");
    }
}
