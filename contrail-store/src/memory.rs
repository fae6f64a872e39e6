//! In-process [`BookingStore`] used by tests and local runs without Postgres.
//!
//! A unit of work holds the store lock from `begin` until commit or drop and
//! mutates a private copy of the state, so transactions are serializable and
//! uncommitted writes are never visible.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contrail_core::booking::{Booking, BookingStatus, Ticket, TicketStatus};
use contrail_core::error::{StoreError, StoreResult};
use contrail_core::flight::{Flight, FlightStatus, SeatClass, SeatPool};
use contrail_core::repository::{BookingStore, UnitOfWork};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    flights: HashMap<Uuid, Flight>,
    pools: HashMap<(Uuid, SeatClass), SeatPool>,
    bookings: HashMap<Uuid, Booking>,
    // (insertion sequence, ticket)
    tickets: HashMap<Uuid, (u64, Ticket)>,
    next_ticket_seq: u64,
    seat_codes: HashMap<(Uuid, String), Uuid>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_seat_pool_insert: Option<SeatClass>,
    fail_ticket_insert_after: Option<usize>,
    occupy_delay: Option<Duration>,
}

/// A row a Postgres unit of work would lock, in the order it was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowLock {
    SeatPool(Uuid, SeatClass),
    Ticket(Uuid),
    SeatCode(Uuid, String),
}

#[derive(Clone, Default)]
pub struct InMemoryBookingStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Mutex<Faults>>,
    row_locks: Arc<Mutex<Vec<RowLock>>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next insert of a seat pool for `class` fails.
    pub async fn fail_seat_pool_insert(&self, class: SeatClass) {
        self.faults.lock().await.fail_seat_pool_insert = Some(class);
    }

    /// Ticket inserts fail once `count` tickets were inserted in the same
    /// unit of work. Cleared after it fires.
    pub async fn fail_ticket_insert_after(&self, count: usize) {
        self.faults.lock().await.fail_ticket_insert_after = Some(count);
    }

    /// Every seat occupancy attempt sleeps first.
    pub async fn delay_seat_occupancy(&self, delay: Duration) {
        self.faults.lock().await.occupy_delay = Some(delay);
    }

    pub async fn clear_faults(&self) {
        *self.faults.lock().await = Faults::default();
    }

    /// Ticket currently holding a seat code, if any.
    pub async fn seat_holder(&self, flight_id: Uuid, seat_code: &str) -> Option<Uuid> {
        let state = self.state.lock().await;
        state.seat_codes.get(&(flight_id, seat_code.to_string())).copied()
    }

    /// Row locks taken by units of work since the last clear.
    pub async fn row_locks(&self) -> Vec<RowLock> {
        self.row_locks.lock().await.clone()
    }

    pub async fn clear_row_locks(&self) {
        self.row_locks.lock().await.clear();
    }

    pub async fn booking_count(&self) -> usize {
        self.state.lock().await.bookings.len()
    }

    pub async fn ticket_count(&self) -> usize {
        self.state.lock().await.tickets.len()
    }

    pub async fn flight_count(&self) -> usize {
        self.state.lock().await.flights.len()
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    faults: Arc<Mutex<Faults>>,
    row_locks: Arc<Mutex<Vec<RowLock>>>,
    tickets_inserted: usize,
}

impl MemoryUnitOfWork {
    async fn lock_row(&self, row: RowLock) {
        self.row_locks.lock().await.push(row);
    }
}

impl MemoryState {
    fn pools_of(&self, flight_id: Uuid) -> Vec<SeatPool> {
        let mut pools: Vec<SeatPool> = self
            .pools
            .values()
            .filter(|p| p.flight_id == flight_id)
            .cloned()
            .collect();
        pools.sort_by_key(|p| p.class);
        pools
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            faults: self.faults.clone(),
            row_locks: self.row_locks.clone(),
            tickets_inserted: 0,
        }))
    }

    async fn find_flight(&self, flight_id: Uuid) -> StoreResult<Option<Flight>> {
        Ok(self.state.lock().await.flights.get(&flight_id).cloned())
    }

    async fn seat_pools(&self, flight_id: Uuid) -> StoreResult<Vec<SeatPool>> {
        Ok(self.state.lock().await.pools_of(flight_id))
    }

    async fn update_flight_status(&self, flight_id: Uuid, status: FlightStatus) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.flights.get_mut(&flight_id) {
            Some(flight) => {
                flight.status = status;
                flight.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.state.lock().await.bookings.get(&booking_id).cloned())
    }

    async fn find_ticket(&self, ticket_id: Uuid) -> StoreResult<Option<Ticket>> {
        Ok(self.state.lock().await.tickets.get(&ticket_id).map(|(_, t)| t.clone()))
    }

    async fn tickets_for_booking(&self, booking_id: Uuid) -> StoreResult<Vec<Ticket>> {
        let state = self.state.lock().await;
        let mut tickets: Vec<&(u64, Ticket)> = state
            .tickets
            .values()
            .filter(|(_, t)| t.booking_id == booking_id)
            .collect();
        tickets.sort_by_key(|(seq, _)| *seq);
        Ok(tickets.into_iter().map(|(_, t)| t.clone()).collect())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn insert_flight(&mut self, flight: &Flight) -> StoreResult<()> {
        if self.working.flights.contains_key(&flight.id) {
            return Err(StoreError::Database(format!("duplicate flight {}", flight.id)));
        }
        self.working.flights.insert(flight.id, flight.clone());
        Ok(())
    }

    async fn insert_seat_pool(&mut self, pool: &SeatPool) -> StoreResult<()> {
        {
            let mut faults = self.faults.lock().await;
            if faults.fail_seat_pool_insert == Some(pool.class) {
                faults.fail_seat_pool_insert = None;
                return Err(StoreError::Injected(format!("seat pool insert for {}", pool.class)));
            }
        }

        if !self.working.flights.contains_key(&pool.flight_id) {
            return Err(StoreError::Database(format!("unknown flight {}", pool.flight_id)));
        }
        let key = (pool.flight_id, pool.class);
        if self.working.pools.contains_key(&key) {
            return Err(StoreError::Database(format!(
                "duplicate seat pool {} for flight {}",
                pool.class, pool.flight_id
            )));
        }
        self.working.pools.insert(key, pool.clone());
        Ok(())
    }

    async fn find_flight(&mut self, flight_id: Uuid) -> StoreResult<Option<Flight>> {
        Ok(self.working.flights.get(&flight_id).cloned())
    }

    async fn seat_pools(&mut self, flight_id: Uuid) -> StoreResult<Vec<SeatPool>> {
        Ok(self.working.pools_of(flight_id))
    }

    async fn try_occupy_seat(&mut self, flight_id: Uuid, class: SeatClass) -> StoreResult<bool> {
        let delay = self.faults.lock().await.occupy_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.lock_row(RowLock::SeatPool(flight_id, class)).await;
        match self.working.pools.get_mut(&(flight_id, class)) {
            Some(pool) if pool.has_free_seat() => {
                pool.occupied += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_seat(&mut self, flight_id: Uuid, class: SeatClass) -> StoreResult<bool> {
        self.lock_row(RowLock::SeatPool(flight_id, class)).await;
        match self.working.pools.get_mut(&(flight_id, class)) {
            Some(pool) if pool.occupied > 0 => {
                pool.occupied -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        self.working.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn find_booking_for_update(&mut self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.working.bookings.get(&booking_id).cloned())
    }

    async fn update_booking_status(
        &mut self,
        booking_id: Uuid,
        status: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        if let Some(booking) = self.working.bookings.get_mut(&booking_id) {
            booking.status = status;
            booking.updated_at = updated_at;
        }
        Ok(())
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> StoreResult<()> {
        {
            let mut faults = self.faults.lock().await;
            if let Some(limit) = faults.fail_ticket_insert_after {
                if self.tickets_inserted >= limit {
                    faults.fail_ticket_insert_after = None;
                    return Err(StoreError::Injected(format!("ticket insert #{}", self.tickets_inserted + 1)));
                }
            }
        }

        if !self.working.bookings.contains_key(&ticket.booking_id) {
            return Err(StoreError::Database(format!("unknown booking {}", ticket.booking_id)));
        }
        let seq = self.working.next_ticket_seq;
        self.working.next_ticket_seq += 1;
        self.working.tickets.insert(ticket.id, (seq, ticket.clone()));
        self.tickets_inserted += 1;
        Ok(())
    }

    async fn find_ticket_for_update(&mut self, ticket_id: Uuid) -> StoreResult<Option<Ticket>> {
        self.lock_row(RowLock::Ticket(ticket_id)).await;
        Ok(self.working.tickets.get(&ticket_id).map(|(_, t)| t.clone()))
    }

    async fn update_ticket_status(
        &mut self,
        ticket_id: Uuid,
        status: TicketStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        if let Some((_, ticket)) = self.working.tickets.get_mut(&ticket_id) {
            ticket.status = status;
            ticket.updated_at = updated_at;
        }
        Ok(())
    }

    async fn claim_seat_code(&mut self, flight_id: Uuid, seat_code: &str, ticket_id: Uuid) -> StoreResult<bool> {
        self.lock_row(RowLock::SeatCode(flight_id, seat_code.to_string())).await;
        let key = (flight_id, seat_code.to_string());
        if self.working.seat_codes.contains_key(&key) {
            return Ok(false);
        }
        // One seat per ticket, same as the unique constraint in Postgres.
        if self.working.seat_codes.values().any(|holder| *holder == ticket_id) {
            return Err(StoreError::Database(format!("ticket {} already holds a seat", ticket_id)));
        }
        self.working.seat_codes.insert(key, ticket_id);
        Ok(true)
    }

    async fn release_seat_code(&mut self, flight_id: Uuid, seat_code: &str, ticket_id: Uuid) -> StoreResult<()> {
        let key = (flight_id, seat_code.to_string());
        if self.working.seat_codes.get(&key) == Some(&ticket_id) {
            self.working.seat_codes.remove(&key);
        }
        Ok(())
    }

    async fn update_ticket_seat(
        &mut self,
        ticket_id: Uuid,
        seat_code: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        if let Some((_, ticket)) = self.working.tickets.get_mut(&ticket_id) {
            ticket.seat_code = seat_code.map(str::to_string);
            ticket.updated_at = updated_at;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork { mut guard, working, .. } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
