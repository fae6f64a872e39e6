use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::app_config::DatabaseConfig;
use crate::pg_store::PostgresBookingStore;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!(
            "Connected to Postgres (max {} connections)",
            config.max_connections
        );
        Ok(Self { pool })
    }

    /// Booking store sharing this client's pool.
    pub fn booking_store(&self) -> PostgresBookingStore {
        PostgresBookingStore::new(self.pool.clone())
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Applying booking engine migrations");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Booking engine schema is up to date");
        Ok(())
    }
}
