use crate::booking::{BookingStatus, TicketStatus};
use crate::flight::{FlightStatus, SeatClass};
use uuid::Uuid;

/// Coarse classification of a [`BookingError`].
///
/// Collaborators (HTTP layer, retry loops) branch on this instead of the
/// message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    ValidationFailed,
    CapacityExceeded,
    IllegalStateTransition,
    TransactionAborted,
    /// A collaborator called after commit (payment gateway) failed.
    ExternalService,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Flight not found: {0}")]
    FlightNotFound(Uuid),

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Ticket not found: {0}")]
    TicketNotFound(Uuid),

    #[error("Invalid trip type: {0}")]
    InvalidTripType(String),

    #[error("Invalid seat code {code}: {reason}")]
    InvalidSeatCode { code: String, reason: String },

    #[error("Ticket {ticket_id} does not belong to booking {booking_id}")]
    TicketNotInBooking { ticket_id: Uuid, booking_id: Uuid },

    #[error("Validation failed: {0}")]
    InvalidRequest(String),

    #[error("Flight {flight_id} is not accepting bookings (status {status})")]
    FlightNotBookable { flight_id: Uuid, status: FlightStatus },

    #[error("No seats available in {class} on flight {flight_id}")]
    NoSeatsAvailable { flight_id: Uuid, class: SeatClass },

    #[error("Ticket {ticket_id} cannot be cancelled in status {status}")]
    TicketNotCancellable { ticket_id: Uuid, status: TicketStatus },

    #[error("Ticket {ticket_id} cannot be reseated in status {status}")]
    TicketNotReassignable { ticket_id: Uuid, status: TicketStatus },

    #[error("Seat {seat_code} on flight {flight_id} is already occupied")]
    SeatOccupied { flight_id: Uuid, seat_code: String },

    #[error("Invalid booking state transition from {from} to {to}")]
    InvalidBookingTransition { from: BookingStatus, to: BookingStatus },

    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::FlightNotFound(_)
            | BookingError::BookingNotFound(_)
            | BookingError::TicketNotFound(_) => ErrorKind::NotFound,

            BookingError::InvalidTripType(_)
            | BookingError::InvalidSeatCode { .. }
            | BookingError::TicketNotInBooking { .. }
            | BookingError::InvalidRequest(_)
            | BookingError::FlightNotBookable { .. } => ErrorKind::ValidationFailed,

            BookingError::NoSeatsAvailable { .. } => ErrorKind::CapacityExceeded,

            BookingError::TicketNotCancellable { .. }
            | BookingError::TicketNotReassignable { .. }
            | BookingError::SeatOccupied { .. }
            | BookingError::InvalidBookingTransition { .. } => ErrorKind::IllegalStateTransition,

            BookingError::TransactionAborted(_) => ErrorKind::TransactionAborted,

            BookingError::PaymentGateway(_) => ErrorKind::ExternalService,
        }
    }

    /// Only aborted transactions may be retried with the same input.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::TransactionAborted
    }
}

/// Failures raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Serialization failure or deadlock reported by the database.
    #[error("Storage conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    /// A persisted value could not be mapped back into the domain model.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// Injected by test doubles.
    #[error("Injected failure: {0}")]
    Injected(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        BookingError::TransactionAborted(err.to_string())
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
