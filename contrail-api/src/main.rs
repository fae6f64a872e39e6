use contrail_api::{
    app,
    state::{engine_settings, AppState, AuthConfig},
};
use contrail_booking::{BookingEngine, MockPaymentAdapter};
use contrail_core::notify::NotificationDispatcher;
use contrail_store::app_config::Config;
use contrail_store::{DbClient, LogNotifier};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn notifier(config: &Config) -> Arc<dyn NotificationDispatcher> {
    #[cfg(feature = "kafka")]
    if config.kafka.enabled {
        let producer = contrail_store::EventProducer::new(&config.kafka.brokers)
            .expect("Failed to create Kafka producer");
        return Arc::new(producer);
    }

    if config.kafka.enabled {
        tracing::warn!("Kafka is enabled in config but this build has no kafka feature; logging notifications");
    }
    Arc::new(LogNotifier)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contrail_api=debug,contrail_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Contrail API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let settings = engine_settings(&config.booking).expect("Invalid [booking] config");
    let engine = BookingEngine::new(
        Arc::new(db.booking_store()),
        notifier(&config),
        Arc::new(MockPaymentAdapter),
        settings,
    );

    let app_state = AppState {
        engine: Arc::new(engine),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server error");
}
