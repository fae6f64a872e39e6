#![allow(dead_code)]

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use contrail_core::booking::{Booking, Gender, Ticket, TicketOwner, TripType};
use contrail_core::flight::{Flight, FlightSpec, FlightStatus, SeatClass, SeatPool};
use contrail_core::money::Multiplier;
use contrail_core::repository::BookingStore;
use contrail_shared::Masked;
use contrail_store::app_config::DatabaseConfig;
use contrail_store::{DbClient, PostgresBookingStore};
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// One container for the whole test binary; tests keep apart by using
/// their own flights.
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

/// Migrated store with enough connections for every racer to hold one.
pub async fn pg_store() -> PostgresBookingStore {
    let ctx = shared_postgres().await;
    let db = DbClient::new(&DatabaseConfig {
        url: ctx.url.clone(),
        max_connections: 32,
        acquire_timeout_seconds: 30,
    })
    .await
    .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");
    db.booking_store()
}

pub fn owner(first_name: &str) -> TicketOwner {
    TicketOwner {
        first_name: first_name.to_string(),
        last_name: "Tran".to_string(),
        phone_number: Masked::from("0987654321"),
        gender: Gender::Female,
        date_of_birth: NaiveDate::from_ymd_opt(1990, 6, 2).unwrap(),
        passport_number: Some(Masked::from("N2233445")),
        identification_number: None,
        address: None,
    }
}

fn pool(flight_id: Uuid, class: SeatClass, max_row: i32, max_col: i32) -> SeatPool {
    SeatPool {
        flight_id,
        class,
        class_multiplier: Multiplier::ONE,
        child_multiplier: Multiplier::DEFAULT_CHILD,
        max_row,
        max_col,
        occupied: 0,
    }
}

/// A flight whose economy cabin has `economy_seats` seats, committed.
pub async fn seed_flight(store: &PostgresBookingStore, economy_seats: i32) -> Flight {
    let departs = Utc.with_ymd_and_hms(2031, 1, 15, 9, 0, 0).unwrap();
    let flight = FlightSpec {
        flight_number: "VN900".to_string(),
        aircraft_type: Some("B787".to_string()),
        departure_airport: "SGN".to_string(),
        arrival_airport: "PQC".to_string(),
        departure_city: "Ho Chi Minh City".to_string(),
        arrival_city: "Phu Quoc".to_string(),
        scheduled_departure: departs,
        scheduled_arrival: departs + Duration::hours(1),
        base_price: 800_000,
        status: FlightStatus::OnTime,
    }
    .into_flight();

    let mut uow = store.begin().await.unwrap();
    uow.insert_flight(&flight).await.unwrap();
    uow.insert_seat_pool(&pool(flight.id, SeatClass::Economy, 1, economy_seats))
        .await
        .unwrap();
    uow.insert_seat_pool(&pool(flight.id, SeatClass::Business, 1, 2)).await.unwrap();
    uow.insert_seat_pool(&pool(flight.id, SeatClass::First, 1, 1)).await.unwrap();
    uow.commit().await.unwrap();
    flight
}

/// A booking holding `count` economy tickets, each occupying a seat.
pub async fn seed_tickets(store: &PostgresBookingStore, flight: &Flight, count: usize) -> Vec<Ticket> {
    let booking = Booking::new("racer@example.com".to_string(), TripType::OneWay, flight.id, None);
    let tickets: Vec<Ticket> = (0..count)
        .map(|i| {
            Ticket::issue(
                booking.id,
                flight.id,
                SeatClass::Economy,
                flight.base_price,
                owner(&format!("Pax{}", i)),
            )
        })
        .collect();

    let mut uow = store.begin().await.unwrap();
    uow.insert_booking(&booking).await.unwrap();
    for ticket in &tickets {
        assert!(uow.try_occupy_seat(flight.id, SeatClass::Economy).await.unwrap());
        uow.insert_ticket(ticket).await.unwrap();
    }
    uow.commit().await.unwrap();
    tickets
}

pub async fn economy_occupied(store: &PostgresBookingStore, flight_id: Uuid) -> i32 {
    store
        .seat_pools(flight_id)
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.class == SeatClass::Economy)
        .map(|p| p.occupied)
        .unwrap()
}
