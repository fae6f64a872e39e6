pub mod models;
pub mod pii;

pub use models::events::BookingNotification;
pub use pii::Masked;
