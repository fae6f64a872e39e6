use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use contrail_core::booking::{Booking, BookingStatus, Ticket, TicketOwner, TicketStatus};
use contrail_core::error::{StoreError, StoreResult};
use contrail_core::flight::{Flight, FlightStatus, SeatClass, SeatPool};
use contrail_core::money::Multiplier;
use contrail_core::repository::{BookingStore, UnitOfWork};
use contrail_shared::pii::Masked;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use std::str::FromStr;
use uuid::Uuid;

/// Postgres-backed store.
///
/// Seat capacity is protected by conditional updates on
/// `flight_seat_pools.occupied`, seat codes by the primary key of
/// `seat_assignments`.
#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    flight_number: String,
    aircraft_type: Option<String>,
    departure_airport: String,
    arrival_airport: String,
    departure_city: String,
    arrival_city: String,
    scheduled_departure: DateTime<Utc>,
    scheduled_arrival: DateTime<Utc>,
    actual_departure: Option<DateTime<Utc>>,
    actual_arrival: Option<DateTime<Utc>>,
    base_price: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct SeatPoolRow {
    flight_id: Uuid,
    seat_class: String,
    class_multiplier: i32,
    child_multiplier: i32,
    max_row: i32,
    max_col: i32,
    occupied: i32,
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    booker_email: String,
    trip_type: String,
    departure_flight_id: Uuid,
    return_flight_id: Option<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    booking_id: Uuid,
    flight_id: Uuid,
    seat_class: String,
    price: i64,
    status: String,
    seat_code: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    first_name: String,
    last_name: String,
    phone_number: String,
    gender: String,
    date_of_birth: NaiveDate,
    passport_number: Option<String>,
    identification_number: Option<String>,
    address: Option<String>,
}

fn parse_column<T: FromStr<Err = String>>(value: &str) -> StoreResult<T> {
    T::from_str(value).map_err(StoreError::Corrupt)
}

impl TryFrom<FlightRow> for Flight {
    type Error = StoreError;

    fn try_from(row: FlightRow) -> Result<Self, Self::Error> {
        Ok(Flight {
            id: row.id,
            flight_number: row.flight_number,
            aircraft_type: row.aircraft_type,
            departure_airport: row.departure_airport,
            arrival_airport: row.arrival_airport,
            departure_city: row.departure_city,
            arrival_city: row.arrival_city,
            scheduled_departure: row.scheduled_departure,
            scheduled_arrival: row.scheduled_arrival,
            actual_departure: row.actual_departure,
            actual_arrival: row.actual_arrival,
            base_price: row.base_price,
            status: parse_column::<FlightStatus>(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<SeatPoolRow> for SeatPool {
    type Error = StoreError;

    fn try_from(row: SeatPoolRow) -> Result<Self, Self::Error> {
        Ok(SeatPool {
            flight_id: row.flight_id,
            class: parse_column::<SeatClass>(&row.seat_class)?,
            class_multiplier: Multiplier::from_hundredths(row.class_multiplier),
            child_multiplier: Multiplier::from_hundredths(row.child_multiplier),
            max_row: row.max_row,
            max_col: row.max_col,
            occupied: row.occupied,
        })
    }
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            booker_email: row.booker_email,
            trip_type: parse_column(&row.trip_type)?,
            departure_flight_id: row.departure_flight_id,
            return_flight_id: row.return_flight_id,
            status: parse_column::<BookingStatus>(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StoreError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Ticket {
            id: row.id,
            booking_id: row.booking_id,
            flight_id: row.flight_id,
            seat_class: parse_column(&row.seat_class)?,
            price: row.price,
            status: parse_column::<TicketStatus>(&row.status)?,
            seat_code: row.seat_code,
            owner: TicketOwner {
                first_name: row.first_name,
                last_name: row.last_name,
                phone_number: Masked(row.phone_number),
                gender: parse_column(&row.gender)?,
                date_of_birth: row.date_of_birth,
                passport_number: row.passport_number.map(Masked),
                identification_number: row.identification_number.map(Masked),
                address: row.address,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Serialization failures and deadlocks are conflicts; everything else is a
/// plain database error.
fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if let Some(code) = db_err.code() {
            if code == "40001" || code == "40P01" {
                return StoreError::Conflict(db_err.message().to_string());
            }
        }
    }
    StoreError::Database(err.to_string())
}

const FLIGHT_COLUMNS: &str = r#"
    id, flight_number, aircraft_type, departure_airport, arrival_airport,
    departure_city, arrival_city, scheduled_departure, scheduled_arrival,
    actual_departure, actual_arrival, base_price, status, created_at, updated_at
"#;

const POOL_COLUMNS: &str = r#"
    flight_id, seat_class,
    (class_multiplier * 100)::INT4 AS class_multiplier,
    (child_multiplier * 100)::INT4 AS child_multiplier,
    max_row, max_col, occupied
"#;

const BOOKING_COLUMNS: &str = r#"
    id, booker_email, trip_type, departure_flight_id, return_flight_id,
    status, created_at, updated_at
"#;

const TICKET_SELECT: &str = r#"
    SELECT t.id, t.booking_id, t.flight_id, t.seat_class, t.price, t.status,
           t.seat_code, t.created_at, t.updated_at,
           o.first_name, o.last_name, o.phone_number, o.gender, o.date_of_birth,
           o.passport_number, o.identification_number, o.address
    FROM tickets t
    JOIN ticket_owner_snapshots o ON o.ticket_id = t.id
"#;

async fn fetch_flight<'e, E: PgExecutor<'e>>(executor: E, flight_id: Uuid) -> StoreResult<Option<Flight>> {
    let sql = format!("SELECT {} FROM flights WHERE id = $1", FLIGHT_COLUMNS);
    let row = sqlx::query_as::<_, FlightRow>(&sql)
        .bind(flight_id)
        .fetch_optional(executor)
        .await
        .map_err(map_sqlx_error)?;

    row.map(Flight::try_from).transpose()
}

async fn fetch_seat_pools<'e, E: PgExecutor<'e>>(executor: E, flight_id: Uuid) -> StoreResult<Vec<SeatPool>> {
    let sql = format!(
        "SELECT {} FROM flight_seat_pools WHERE flight_id = $1 ORDER BY seat_class",
        POOL_COLUMNS
    );
    let rows = sqlx::query_as::<_, SeatPoolRow>(&sql)
        .bind(flight_id)
        .fetch_all(executor)
        .await
        .map_err(map_sqlx_error)?;

    let mut pools = rows
        .into_iter()
        .map(SeatPool::try_from)
        .collect::<StoreResult<Vec<_>>>()?;
    pools.sort_by_key(|p| p.class);
    Ok(pools)
}

async fn fetch_booking<'e, E: PgExecutor<'e>>(
    executor: E,
    booking_id: Uuid,
    lock: bool,
) -> StoreResult<Option<Booking>> {
    let sql = format!(
        "SELECT {} FROM bookings WHERE id = $1{}",
        BOOKING_COLUMNS,
        if lock { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query_as::<_, BookingRow>(&sql)
        .bind(booking_id)
        .fetch_optional(executor)
        .await
        .map_err(map_sqlx_error)?;

    row.map(Booking::try_from).transpose()
}

async fn fetch_ticket<'e, E: PgExecutor<'e>>(
    executor: E,
    ticket_id: Uuid,
    lock: bool,
) -> StoreResult<Option<Ticket>> {
    let sql = format!(
        "{} WHERE t.id = $1{}",
        TICKET_SELECT,
        if lock { " FOR UPDATE OF t" } else { "" }
    );
    let row = sqlx::query_as::<_, TicketRow>(&sql)
        .bind(ticket_id)
        .fetch_optional(executor)
        .await
        .map_err(map_sqlx_error)?;

    row.map(Ticket::try_from).transpose()
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn find_flight(&self, flight_id: Uuid) -> StoreResult<Option<Flight>> {
        fetch_flight(&self.pool, flight_id).await
    }

    async fn seat_pools(&self, flight_id: Uuid) -> StoreResult<Vec<SeatPool>> {
        fetch_seat_pools(&self.pool, flight_id).await
    }

    async fn update_flight_status(&self, flight_id: Uuid, status: FlightStatus) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE flights SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(flight_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        fetch_booking(&self.pool, booking_id, false).await
    }

    async fn find_ticket(&self, ticket_id: Uuid) -> StoreResult<Option<Ticket>> {
        fetch_ticket(&self.pool, ticket_id, false).await
    }

    async fn tickets_for_booking(&self, booking_id: Uuid) -> StoreResult<Vec<Ticket>> {
        let sql = format!("{} WHERE t.booking_id = $1 ORDER BY t.created_at, t.id", TICKET_SELECT);
        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(booking_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(Ticket::try_from).collect()
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn insert_flight(&mut self, flight: &Flight) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO flights (id, flight_number, aircraft_type, departure_airport, arrival_airport,
                                 departure_city, arrival_city, scheduled_departure, scheduled_arrival,
                                 actual_departure, actual_arrival, base_price, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(&flight.aircraft_type)
        .bind(&flight.departure_airport)
        .bind(&flight.arrival_airport)
        .bind(&flight.departure_city)
        .bind(&flight.arrival_city)
        .bind(flight.scheduled_departure)
        .bind(flight.scheduled_arrival)
        .bind(flight.actual_departure)
        .bind(flight.actual_arrival)
        .bind(flight.base_price)
        .bind(flight.status.as_str())
        .bind(flight.created_at)
        .bind(flight.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn insert_seat_pool(&mut self, pool: &SeatPool) -> StoreResult<()> {
        // Multipliers travel as hundredths and are scaled back to NUMERIC(6,2).
        sqlx::query(
            r#"
            INSERT INTO flight_seat_pools (flight_id, seat_class, class_multiplier, child_multiplier, max_row, max_col, occupied)
            VALUES ($1, $2, $3::NUMERIC / 100, $4::NUMERIC / 100, $5, $6, $7)
            "#,
        )
        .bind(pool.flight_id)
        .bind(pool.class.as_str())
        .bind(pool.class_multiplier.hundredths())
        .bind(pool.child_multiplier.hundredths())
        .bind(pool.max_row)
        .bind(pool.max_col)
        .bind(pool.occupied)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_flight(&mut self, flight_id: Uuid) -> StoreResult<Option<Flight>> {
        fetch_flight(&mut *self.tx, flight_id).await
    }

    async fn seat_pools(&mut self, flight_id: Uuid) -> StoreResult<Vec<SeatPool>> {
        fetch_seat_pools(&mut *self.tx, flight_id).await
    }

    async fn try_occupy_seat(&mut self, flight_id: Uuid, class: SeatClass) -> StoreResult<bool> {
        // The WHERE clause is re-evaluated after any row lock wait, so two
        // writers racing for the last seat cannot both match.
        let result = sqlx::query(
            r#"
            UPDATE flight_seat_pools
            SET occupied = occupied + 1
            WHERE flight_id = $1 AND seat_class = $2 AND occupied < max_row * max_col
            "#,
        )
        .bind(flight_id)
        .bind(class.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_seat(&mut self, flight_id: Uuid, class: SeatClass) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE flight_seat_pools
            SET occupied = occupied - 1
            WHERE flight_id = $1 AND seat_class = $2 AND occupied > 0
            "#,
        )
        .bind(flight_id)
        .bind(class.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, booker_email, trip_type, departure_flight_id, return_flight_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.booker_email)
        .bind(booking.trip_type.as_str())
        .bind(booking.departure_flight_id)
        .bind(booking.return_flight_id)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_booking_for_update(&mut self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        fetch_booking(&mut *self.tx, booking_id, true).await
    }

    async fn update_booking_status(
        &mut self,
        booking_id: Uuid,
        status: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE bookings SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(updated_at)
            .bind(booking_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tickets (id, booking_id, flight_id, seat_class, price, status, seat_code, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.booking_id)
        .bind(ticket.flight_id)
        .bind(ticket.seat_class.as_str())
        .bind(ticket.price)
        .bind(ticket.status.as_str())
        .bind(&ticket.seat_code)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        let owner = &ticket.owner;
        sqlx::query(
            r#"
            INSERT INTO ticket_owner_snapshots (ticket_id, first_name, last_name, phone_number, gender,
                                                date_of_birth, passport_number, identification_number, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(ticket.id)
        .bind(&owner.first_name)
        .bind(&owner.last_name)
        .bind(owner.phone_number.expose())
        .bind(owner.gender.as_str())
        .bind(owner.date_of_birth)
        .bind(owner.passport_number.as_ref().map(|p| p.expose().clone()))
        .bind(owner.identification_number.as_ref().map(|p| p.expose().clone()))
        .bind(&owner.address)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_ticket_for_update(&mut self, ticket_id: Uuid) -> StoreResult<Option<Ticket>> {
        fetch_ticket(&mut *self.tx, ticket_id, true).await
    }

    async fn update_ticket_status(
        &mut self,
        ticket_id: Uuid,
        status: TicketStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE tickets SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(updated_at)
            .bind(ticket_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn claim_seat_code(&mut self, flight_id: Uuid, seat_code: &str, ticket_id: Uuid) -> StoreResult<bool> {
        // A concurrent insert of the same key blocks until the other
        // transaction ends, then resolves to DO NOTHING if it committed.
        let result = sqlx::query(
            r#"
            INSERT INTO seat_assignments (flight_id, seat_code, ticket_id)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(flight_id)
        .bind(seat_code)
        .bind(ticket_id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_seat_code(&mut self, flight_id: Uuid, seat_code: &str, ticket_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM seat_assignments WHERE flight_id = $1 AND seat_code = $2 AND ticket_id = $3")
            .bind(flight_id)
            .bind(seat_code)
            .bind(ticket_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update_ticket_seat(
        &mut self,
        ticket_id: Uuid,
        seat_code: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE tickets SET seat_code = $1, updated_at = $2 WHERE id = $3")
            .bind(seat_code)
            .bind(updated_at)
            .bind(ticket_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}
