#![allow(dead_code)]

pub mod postgres;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use contrail_booking::{BookingEngine, EngineSettings, MockPaymentAdapter};
use contrail_core::booking::{CreateBookingRequest, Gender, PassengerTicketSpec, TicketOwner, TripType};
use contrail_core::flight::{Flight, FlightSpec, FlightStatus, SeatClass, SeatClassSpec};
use contrail_core::notify::NotificationDispatcher;
use contrail_shared::{BookingNotification, Masked};
use contrail_store::InMemoryBookingStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const BASE_PRICE: i64 = 1_000_000;

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<BookingNotification>>,
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn dispatch(
        &self,
        notification: &BookingNotification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}

impl RecordingNotifier {
    /// Dispatch happens on a spawned task; poll until `count` arrived.
    pub async fn wait_for(&self, count: usize) -> Vec<BookingNotification> {
        for _ in 0..100 {
            {
                let sent = self.sent.lock().await;
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent.lock().await.clone()
    }
}

/// Always fails, to show that dispatch errors never reach the caller.
pub struct BrokenNotifier;

#[async_trait]
impl NotificationDispatcher for BrokenNotifier {
    async fn dispatch(
        &self,
        _notification: &BookingNotification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err("broker unreachable".into())
    }
}

pub struct Harness {
    pub store: InMemoryBookingStore,
    pub notifier: Arc<RecordingNotifier>,
    pub engine: Arc<BookingEngine>,
}

pub fn harness() -> Harness {
    harness_with(EngineSettings::default())
}

pub fn harness_with(settings: EngineSettings) -> Harness {
    let store = InMemoryBookingStore::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = Arc::new(BookingEngine::new(
        Arc::new(store.clone()),
        notifier.clone(),
        Arc::new(MockPaymentAdapter),
        settings,
    ));
    Harness { store, notifier, engine }
}

pub fn departure_day() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 7, 1, 8, 0, 0).unwrap()
}

pub fn flight_spec(number: &str, from: &str, to: &str) -> FlightSpec {
    FlightSpec {
        flight_number: number.to_string(),
        aircraft_type: Some("A321".to_string()),
        departure_airport: from.to_string(),
        arrival_airport: to.to_string(),
        departure_city: format!("{} city", from),
        arrival_city: format!("{} city", to),
        scheduled_departure: departure_day(),
        scheduled_arrival: departure_day() + ChronoDuration::hours(2),
        base_price: BASE_PRICE,
        status: FlightStatus::OnTime,
    }
}

pub fn cabin(max_row: i32, max_col: i32, multiplier: f64) -> SeatClassSpec {
    SeatClassSpec {
        max_row,
        max_col,
        multiplier,
        child_multiplier: None,
    }
}

/// Economy 10x6 at 1.0, business 2x4 at 1.5, first 1x2 at 2.5.
pub async fn provision(h: &Harness, number: &str) -> Flight {
    h.engine
        .create_flight_with_seats(
            flight_spec(number, "SGN", "HAN"),
            cabin(10, 6, 1.0),
            cabin(2, 4, 1.5),
            cabin(1, 2, 2.5),
        )
        .await
        .unwrap()
}

/// A flight whose economy cabin has `seats` seats in a single row.
pub async fn provision_tiny(h: &Harness, number: &str, seats: i32) -> Flight {
    h.engine
        .create_flight_with_seats(
            flight_spec(number, "HAN", "DAD"),
            cabin(1, seats, 1.0),
            cabin(1, 1, 1.5),
            cabin(1, 1, 2.5),
        )
        .await
        .unwrap()
}

pub fn adult(first_name: &str) -> TicketOwner {
    TicketOwner {
        first_name: first_name.to_string(),
        last_name: "Pham".to_string(),
        phone_number: Masked::from("0912345678"),
        gender: Gender::Other,
        date_of_birth: NaiveDate::from_ymd_opt(1988, 3, 14).unwrap(),
        passport_number: Some(Masked::from("C1234567")),
        identification_number: None,
        address: Some("12 Nguyen Hue, District 1".to_string()),
    }
}

pub fn child(first_name: &str) -> TicketOwner {
    TicketOwner {
        date_of_birth: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        passport_number: None,
        ..adult(first_name)
    }
}

pub fn one_way(flight_id: Uuid, passengers: Vec<(SeatClass, TicketOwner)>) -> CreateBookingRequest {
    CreateBookingRequest {
        booker_email: "booker@example.com".to_string(),
        trip_type: TripType::OneWay,
        departure_flight_id: flight_id,
        return_flight_id: None,
        passengers: passengers
            .into_iter()
            .map(|(seat_class, owner)| PassengerTicketSpec::new(seat_class, owner))
            .collect(),
    }
}

pub fn round_trip(
    departure: Uuid,
    return_flight: Option<Uuid>,
    passengers: Vec<(SeatClass, TicketOwner)>,
) -> CreateBookingRequest {
    CreateBookingRequest {
        trip_type: TripType::RoundTrip,
        return_flight_id: return_flight,
        ..one_way(departure, passengers)
    }
}

pub async fn occupied(h: &Harness, flight_id: Uuid, class: SeatClass) -> i32 {
    h.engine
        .flight_occupancy(flight_id)
        .await
        .unwrap()
        .into_iter()
        .find(|o| o.class == class)
        .map(|o| o.occupied)
        .unwrap()
}
