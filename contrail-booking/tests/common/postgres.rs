use contrail_booking::{BookingEngine, EngineSettings, MockPaymentAdapter};
use contrail_store::app_config::DatabaseConfig;
use contrail_store::{DbClient, LogNotifier};
use std::sync::Arc;
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct SharedPostgres {
    _container: ContainerAsync<Postgres>,
    url: String,
}

static POSTGRES: OnceCell<SharedPostgres> = OnceCell::const_new();

async fn shared_postgres() -> &'static SharedPostgres {
    POSTGRES
        .get_or_init(|| async {
            let container = Postgres::default()
                .with_tag("16-alpine")
                .start()
                .await
                .expect("Failed to start Postgres container");

            let host = container.get_host().await.expect("Failed to get host");
            let port = container
                .get_host_port_ipv4(5432)
                .await
                .expect("Failed to get port");

            SharedPostgres {
                url: format!("postgres://postgres:postgres@{}:{}/postgres", host, port),
                _container: container,
            }
        })
        .await
}

/// Engine over a migrated Postgres store in a shared container.
pub async fn pg_engine() -> Arc<BookingEngine> {
    let ctx = shared_postgres().await;
    let db = DbClient::new(&DatabaseConfig {
        url: ctx.url.clone(),
        max_connections: 32,
        acquire_timeout_seconds: 30,
    })
    .await
    .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    Arc::new(BookingEngine::new(
        Arc::new(db.booking_store()),
        Arc::new(LogNotifier),
        Arc::new(MockPaymentAdapter),
        EngineSettings::default(),
    ))
}
