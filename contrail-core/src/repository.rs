use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus, Ticket, TicketStatus};
use crate::error::StoreResult;
use crate::flight::{Flight, FlightStatus, SeatClass, SeatPool};

/// A live storage transaction.
///
/// Every mutation of seat occupancy goes through one of these. Dropping a
/// unit of work without calling [`UnitOfWork::commit`] discards its writes.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn insert_flight(&mut self, flight: &Flight) -> StoreResult<()>;

    async fn insert_seat_pool(&mut self, pool: &SeatPool) -> StoreResult<()>;

    async fn find_flight(&mut self, flight_id: Uuid) -> StoreResult<Option<Flight>>;

    async fn seat_pools(&mut self, flight_id: Uuid) -> StoreResult<Vec<SeatPool>>;

    /// Atomic check-and-increment of a pool's occupancy.
    ///
    /// Returns `false` when the pool is full (or missing) and leaves it
    /// untouched.
    async fn try_occupy_seat(&mut self, flight_id: Uuid, class: SeatClass) -> StoreResult<bool>;

    /// Decrements a pool's occupancy, never below zero. Returns `false` if
    /// nothing was decremented.
    async fn release_seat(&mut self, flight_id: Uuid, class: SeatClass) -> StoreResult<bool>;

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()>;

    async fn find_booking_for_update(&mut self, booking_id: Uuid) -> StoreResult<Option<Booking>>;

    async fn update_booking_status(
        &mut self,
        booking_id: Uuid,
        status: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Inserts the ticket together with its owner snapshot.
    async fn insert_ticket(&mut self, ticket: &Ticket) -> StoreResult<()>;

    /// Reads a ticket and locks it for the rest of the transaction.
    async fn find_ticket_for_update(&mut self, ticket_id: Uuid) -> StoreResult<Option<Ticket>>;

    async fn update_ticket_status(
        &mut self,
        ticket_id: Uuid,
        status: TicketStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Claims a physical seat for a ticket. Returns `false` if another
    /// ticket already holds it.
    async fn claim_seat_code(&mut self, flight_id: Uuid, seat_code: &str, ticket_id: Uuid) -> StoreResult<bool>;

    async fn release_seat_code(&mut self, flight_id: Uuid, seat_code: &str, ticket_id: Uuid) -> StoreResult<()>;

    async fn update_ticket_seat(
        &mut self,
        ticket_id: Uuid,
        seat_code: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Storage backend for the booking engine.
///
/// Reads here run outside any transaction and are only used for validation
/// and reporting; decisions that mutate state re-read through a
/// [`UnitOfWork`].
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;

    async fn find_flight(&self, flight_id: Uuid) -> StoreResult<Option<Flight>>;

    async fn seat_pools(&self, flight_id: Uuid) -> StoreResult<Vec<SeatPool>>;

    async fn update_flight_status(&self, flight_id: Uuid, status: FlightStatus) -> StoreResult<bool>;

    async fn find_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>>;

    async fn find_ticket(&self, ticket_id: Uuid) -> StoreResult<Option<Ticket>>;

    /// Tickets of a booking, oldest first.
    async fn tickets_for_booking(&self, booking_id: Uuid) -> StoreResult<Vec<Ticket>>;
}
