use chrono::{DateTime, Datelike, NaiveDate, Utc};
use contrail_shared::pii::Masked;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::flight::SeatClass;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TripType {
    OneWay,
    RoundTrip,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::OneWay => "oneWay",
            TripType::RoundTrip => "roundTrip",
        }
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oneWay" => Ok(TripType::OneWay),
            "roundTrip" => Ok(TripType::RoundTrip),
            other => Err(format!("unknown trip type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub booker_email: String,
    pub trip_type: TripType,
    pub departure_flight_id: Uuid,
    pub return_flight_id: Option<Uuid>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        booker_email: String,
        trip_type: TripType,
        departure_flight_id: Uuid,
        return_flight_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booker_email,
            trip_type,
            departure_flight_id,
            return_flight_id,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Ticket lifecycle: `Booked` is the only non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Booked,
    Cancelled,
    Used,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Booked => "booked",
            TicketStatus::Cancelled => "cancelled",
            TicketStatus::Used => "used",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(TicketStatus::Booked),
            "cancelled" => Ok(TicketStatus::Cancelled),
            "used" => Ok(TicketStatus::Used),
            other => Err(format!("unknown ticket status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(format!("unknown gender: {}", other)),
        }
    }
}

/// Passenger identity copied onto a ticket when it is issued.
///
/// It is a value, not a link to a customer profile: editing the profile
/// later leaves issued tickets untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketOwner {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Masked<String>,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub passport_number: Option<Masked<String>>,
    pub identification_number: Option<Masked<String>>,
    pub address: Option<String>,
}

impl TicketOwner {
    /// Age in whole years on the given day.
    pub fn age_on(&self, day: NaiveDate) -> i32 {
        let mut age = day.year() - self.date_of_birth.year();
        if (day.month(), day.day()) < (self.date_of_birth.month(), self.date_of_birth.day()) {
            age -= 1;
        }
        age
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub seat_class: SeatClass,
    /// Minor currency units.
    pub price: i64,
    pub status: TicketStatus,
    pub seat_code: Option<String>,
    pub owner: TicketOwner,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn issue(booking_id: Uuid, flight_id: Uuid, seat_class: SeatClass, price: i64, owner: TicketOwner) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_id,
            flight_id,
            seat_class,
            price,
            status: TicketStatus::Booked,
            seat_code: None,
            owner,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One passenger in a booking request. Round trips issue a ticket per leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassengerTicketSpec {
    pub seat_class: SeatClass,
    /// Cabin for the return leg; the departure cabin when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_seat_class: Option<SeatClass>,
    pub owner: TicketOwner,
}

impl PassengerTicketSpec {
    pub fn new(seat_class: SeatClass, owner: TicketOwner) -> Self {
        Self {
            seat_class,
            return_seat_class: None,
            owner,
        }
    }

    pub fn class_for(&self, leg: TripLeg) -> SeatClass {
        match leg {
            TripLeg::Departure => self.seat_class,
            TripLeg::Return => self.return_seat_class.unwrap_or(self.seat_class),
        }
    }
}

/// Which flight of a booking a ticket is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripLeg {
    Departure,
    Return,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub booker_email: String,
    pub trip_type: TripType,
    pub departure_flight_id: Uuid,
    #[serde(default)]
    pub return_flight_id: Option<Uuid>,
    pub passengers: Vec<PassengerTicketSpec>,
}

impl CreateBookingRequest {
    /// The return flight reference, with the nil id treated as absent.
    pub fn return_flight(&self) -> Option<Uuid> {
        self.return_flight_id.filter(|id| !id.is_nil())
    }
}

/// Result of a committed booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingReceipt {
    pub booking: Booking,
    pub departure_tickets: Vec<Ticket>,
    pub return_tickets: Vec<Ticket>,
}

impl BookingReceipt {
    pub fn tickets(&self) -> impl Iterator<Item = &Ticket> {
        self.departure_tickets.iter().chain(self.return_tickets.iter())
    }

    pub fn total_price(&self) -> i64 {
        self.tickets().map(|t| t.price).sum()
    }
}

/// One entry of a seat reassignment request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatChange {
    pub ticket_id: Uuid,
    pub seat_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_class_defaults_to_departure_class() {
        let json = serde_json::json!({
            "seat_class": "business",
            "owner": {
                "first_name": "Lan",
                "last_name": "Nguyen",
                "phone_number": "0900000001",
                "gender": "female",
                "date_of_birth": "1992-04-30",
                "passport_number": null,
                "identification_number": null,
                "address": null
            }
        });
        let mut pax: PassengerTicketSpec = serde_json::from_value(json).unwrap();
        assert_eq!(pax.return_seat_class, None);
        assert_eq!(pax.class_for(TripLeg::Return), SeatClass::Business);

        pax.return_seat_class = Some(SeatClass::Economy);
        assert_eq!(pax.class_for(TripLeg::Departure), SeatClass::Business);
        assert_eq!(pax.class_for(TripLeg::Return), SeatClass::Economy);
    }

    fn owner(dob: NaiveDate) -> TicketOwner {
        TicketOwner {
            first_name: "Lan".into(),
            last_name: "Nguyen".into(),
            phone_number: Masked::from("0900000000"),
            gender: Gender::Female,
            date_of_birth: dob,
            passport_number: None,
            identification_number: None,
            address: None,
        }
    }

    #[test]
    fn test_age_counts_birthday() {
        let pax = owner(NaiveDate::from_ymd_opt(2010, 6, 15).unwrap());
        assert_eq!(pax.age_on(NaiveDate::from_ymd_opt(2028, 6, 14).unwrap()), 17);
        assert_eq!(pax.age_on(NaiveDate::from_ymd_opt(2028, 6, 15).unwrap()), 18);
    }

    #[test]
    fn test_nil_return_flight_is_absent() {
        let req = CreateBookingRequest {
            booker_email: "a@b.c".into(),
            trip_type: TripType::RoundTrip,
            departure_flight_id: Uuid::new_v4(),
            return_flight_id: Some(Uuid::nil()),
            passengers: vec![],
        };
        assert_eq!(req.return_flight(), None);
    }

    #[test]
    fn test_booking_transitions() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Confirmed));
        assert!(!BookingStatus::Confirmed.can_transition_to(BookingStatus::Pending));
        assert!(!BookingStatus::Cancelled.can_transition_to(BookingStatus::Confirmed));
    }

    #[test]
    fn test_trip_type_wire_format() {
        assert_eq!(serde_json::to_string(&TripType::RoundTrip).unwrap(), "\"roundTrip\"");
        assert_eq!("oneWay".parse::<TripType>().unwrap(), TripType::OneWay);
    }
}
