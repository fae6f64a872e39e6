use contrail_booking::{BookingEngine, EngineSettings};
use contrail_core::error::BookingError;
use contrail_core::money::Multiplier;
use contrail_store::app_config::BookingConfig;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    /// Longest accepted token lifetime in seconds, counted from now.
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine>,
    pub auth: AuthConfig,
}

/// Engine settings from the `[booking]` config section. A zero timeout
/// disables the transaction deadline.
pub fn engine_settings(config: &BookingConfig) -> Result<EngineSettings, BookingError> {
    let transaction_timeout = match config.transaction_timeout_ms {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    };

    Ok(EngineSettings {
        transaction_timeout,
        currency: config.currency.clone(),
        default_child_multiplier: Multiplier::from_f64(config.default_child_multiplier)?,
        minor_age_limit: config.minor_age_limit,
    })
}
