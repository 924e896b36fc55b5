//! Configuration module

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served as static fallback (the dashboard frontend)
    #[serde(default)]
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

/// ESP32 controller settings. The address is resolved once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_device_address")]
    pub address: String,
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    #[serde(default = "default_status_timeout_ms")]
    pub status_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl DeviceConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: default_device_address(),
            command_timeout_ms: default_command_timeout_ms(),
            status_timeout_ms: default_status_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_validity_days")]
    pub token_validity_days: u64,
    /// Seconds a new WebSocket may stay unauthenticated before it is closed
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_validity_days: default_token_validity_days(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub mongodb_url: Option<String>,
    #[serde(default = "default_database_name")]
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            mongodb_url: None,
            name: default_database_name(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_device_address() -> String {
    "192.168.1.100".to_string()
}

fn default_command_timeout_ms() -> u64 {
    5000
}

fn default_status_timeout_ms() -> u64 {
    3000
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_token_validity_days() -> u64 {
    7
}

fn default_handshake_timeout_secs() -> u64 {
    30
}

fn default_database_name() -> String {
    "iot_lighting".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("IOTLIGHT").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;

        if config.auth.jwt_secret == default_jwt_secret() {
            tracing::warn!("auth.jwt_secret is the built-in default; set IOTLIGHT__AUTH__JWT_SECRET");
        }

        Ok(config)
    }
}
