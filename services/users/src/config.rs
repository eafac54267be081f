//! Service configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! config file (`users.toml` or the path in `USERS_CONFIG`), then
//! environment variables prefixed with `USERS_`, using `__` between
//! nesting levels (e.g. `USERS_JWT__SECRET`, `USERS_SERVER__PORT`).

use common::DatabaseConfig;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, Source, builder::DefaultState};
use serde::Deserialize;

use crate::jwt::JwtConfig;
use crate::rate_limiter::RateLimiterConfig;

/// Which [`UserStore`](crate::repositories::UserStore) backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Administrator created at start-up when absent
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default = "default_admin_first_name")]
    pub first_name: String,
    #[serde(default = "default_admin_last_name")]
    pub last_name: String,
}

fn default_admin_first_name() -> String {
    "System".to_string()
}

fn default_admin_last_name() -> String {
    "Administrator".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub storage: StorageBackend,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub login_throttle: RateLimiterConfig,
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Settings {
    /// Load settings from the config file (if any) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("USERS_CONFIG").unwrap_or_else(|_| "users".to_string());
        Self::from_source(File::with_name(&path).required(false))
    }

    /// Load settings with `source` layered between the defaults and the environment
    pub fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        with_defaults(Config::builder())?
            .add_source(source)
            .add_source(
                Environment::with_prefix("USERS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let database = DatabaseConfig::default();
    let throttle = RateLimiterConfig::default();

    builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3000)?
        .set_default("storage", "postgres")?
        .set_default("database.url", database.url)?
        .set_default("database.max_connections", database.max_connections)?
        .set_default("database.min_connections", database.min_connections)?
        .set_default("database.connection_timeout", database.connection_timeout)?
        .set_default("jwt.expiry_seconds", 3600)?
        .set_default("login_throttle.max_attempts", throttle.max_attempts)?
        .set_default("login_throttle.window_seconds", throttle.window_seconds)?
        .set_default("login_throttle.lockout_seconds", throttle.lockout_seconds)
}
