pub mod app_config;
pub mod database;
pub mod memory;
pub mod notifier;
pub mod pg_store;

#[cfg(feature = "kafka")]
pub mod events;

pub use app_config::Config;
pub use database::DbClient;
pub use memory::{InMemoryBookingStore, RowLock};
pub use notifier::LogNotifier;
pub use pg_store::PostgresBookingStore;

#[cfg(feature = "kafka")]
pub use events::EventProducer;
