use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
    pub booking: BookingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    /// Deadline for a single unit of work; `0` disables it.
    #[serde(default = "default_transaction_timeout_ms")]
    pub transaction_timeout_ms: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_child_multiplier")]
    pub default_child_multiplier: f64,
    /// Passengers younger than this on the departure date pay the child fare.
    #[serde(default = "default_minor_age_limit")]
    pub minor_age_limit: i32,
}

fn default_transaction_timeout_ms() -> u64 { 5_000 }
fn default_currency() -> String { "USD".to_string() }
fn default_child_multiplier() -> f64 { 0.75 }
fn default_minor_age_limit() -> i32 { 18 }

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            transaction_timeout_ms: default_transaction_timeout_ms(),
            currency: default_currency(),
            default_child_multiplier: default_child_multiplier(),
            minor_age_limit: default_minor_age_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout() -> u64 { 3 }

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default)]
    pub enabled: bool,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local, uncommitted overrides
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `CONTRAIL_DATABASE__URL=postgres://...` sets `database.url`
            .add_source(config::Environment::with_prefix("CONTRAIL").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
