pub mod booking;
pub mod error;
pub mod flight;
pub mod money;
pub mod notify;
pub mod payment;
pub mod repository;

pub use booking::{
    Booking, BookingReceipt, BookingStatus, CreateBookingRequest, Gender, PassengerTicketSpec,
    SeatChange, Ticket, TicketOwner, TicketStatus, TripLeg, TripType,
};
pub use error::{BookingError, BookingResult, ErrorKind, StoreError, StoreResult};
pub use flight::{Flight, FlightSpec, FlightStatus, SeatClass, SeatClassSpec, SeatPool, SeatPoolOccupancy};
pub use money::Multiplier;
pub use notify::NotificationDispatcher;
pub use payment::{PaymentAdapter, PaymentIntent, PaymentStatus};
pub use repository::{BookingStore, UnitOfWork};
