use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub booker_email: String,
    pub departure_flight_id: Uuid,
    pub return_flight_id: Option<Uuid>,
    pub ticket_ids: Vec<Uuid>,
    pub total_price: i64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub booker_email: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct TicketCancelledEvent {
    pub ticket_id: Uuid,
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub seat_class: String,
    pub timestamp: i64,
}

/// Everything the engine tells the outside world about, after commit.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingNotification {
    BookingCreated(BookingCreatedEvent),
    BookingConfirmed(BookingConfirmedEvent),
    TicketCancelled(TicketCancelledEvent),
}

impl BookingNotification {
    pub fn topic(&self) -> &'static str {
        match self {
            BookingNotification::BookingCreated(_) => "booking.created",
            BookingNotification::BookingConfirmed(_) => "booking.confirmed",
            BookingNotification::TicketCancelled(_) => "ticket.cancelled",
        }
    }

    /// Partition key; all events of one booking land on the same partition.
    pub fn key(&self) -> Uuid {
        match self {
            BookingNotification::BookingCreated(e) => e.booking_id,
            BookingNotification::BookingConfirmed(e) => e.booking_id,
            BookingNotification::TicketCancelled(e) => e.booking_id,
        }
    }
}
