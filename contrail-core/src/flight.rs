use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::BookingError;
use crate::money::Multiplier;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FlightStatus {
    OnTime,
    Delayed,
    Cancelled,
    Boarding,
    Takeoff,
    Landing,
    Landed,
}

impl FlightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::OnTime => "on_time",
            FlightStatus::Delayed => "delayed",
            FlightStatus::Cancelled => "cancelled",
            FlightStatus::Boarding => "boarding",
            FlightStatus::Takeoff => "takeoff",
            FlightStatus::Landing => "landing",
            FlightStatus::Landed => "landed",
        }
    }

    /// Only flights that are on time or boarding take new bookings.
    pub fn accepts_bookings(&self) -> bool {
        matches!(self, FlightStatus::OnTime | FlightStatus::Boarding)
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlightStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_time" => Ok(FlightStatus::OnTime),
            "delayed" => Ok(FlightStatus::Delayed),
            "cancelled" => Ok(FlightStatus::Cancelled),
            "boarding" => Ok(FlightStatus::Boarding),
            "takeoff" => Ok(FlightStatus::Takeoff),
            "landing" => Ok(FlightStatus::Landing),
            "landed" => Ok(FlightStatus::Landed),
            other => Err(format!("unknown flight status: {}", other)),
        }
    }
}

/// Cabin class. Declaration order is the cabin order from the nose back,
/// which the seat map relies on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SeatClass {
    First,
    Business,
    Economy,
}

impl SeatClass {
    pub const ALL: [SeatClass; 3] = [SeatClass::First, SeatClass::Business, SeatClass::Economy];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeatClass::First => "first",
            SeatClass::Business => "business",
            SeatClass::Economy => "economy",
        }
    }
}

impl fmt::Display for SeatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(SeatClass::First),
            "business" => Ok(SeatClass::Business),
            "economy" => Ok(SeatClass::Economy),
            other => Err(format!("unknown seat class: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub aircraft_type: Option<String>,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_city: String,
    pub arrival_city: String,
    pub scheduled_departure: DateTime<Utc>,
    pub scheduled_arrival: DateTime<Utc>,
    pub actual_departure: Option<DateTime<Utc>>,
    pub actual_arrival: Option<DateTime<Utc>>,
    /// Minor currency units.
    pub base_price: i64,
    pub status: FlightStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied flight attributes for provisioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightSpec {
    pub flight_number: String,
    pub aircraft_type: Option<String>,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_city: String,
    pub arrival_city: String,
    pub scheduled_departure: DateTime<Utc>,
    pub scheduled_arrival: DateTime<Utc>,
    pub base_price: i64,
    #[serde(default = "default_status")]
    pub status: FlightStatus,
}

fn default_status() -> FlightStatus {
    FlightStatus::OnTime
}

impl FlightSpec {
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.flight_number.trim().is_empty() {
            return Err(BookingError::InvalidRequest("flight number is required".into()));
        }
        if self.departure_airport == self.arrival_airport {
            return Err(BookingError::InvalidRequest(
                "departure and arrival airport must differ".into(),
            ));
        }
        if self.scheduled_arrival <= self.scheduled_departure {
            return Err(BookingError::InvalidRequest(
                "scheduled arrival must be after scheduled departure".into(),
            ));
        }
        if self.base_price < 0 {
            return Err(BookingError::InvalidRequest("base price cannot be negative".into()));
        }
        Ok(())
    }

    pub fn into_flight(self) -> Flight {
        let now = Utc::now();
        Flight {
            id: Uuid::new_v4(),
            flight_number: self.flight_number,
            aircraft_type: self.aircraft_type,
            departure_airport: self.departure_airport,
            arrival_airport: self.arrival_airport,
            departure_city: self.departure_city,
            arrival_city: self.arrival_city,
            scheduled_departure: self.scheduled_departure,
            scheduled_arrival: self.scheduled_arrival,
            actual_departure: None,
            actual_arrival: None,
            base_price: self.base_price,
            status: self.status,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-class provisioning input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatClassSpec {
    pub max_row: i32,
    pub max_col: i32,
    pub multiplier: f64,
    #[serde(default)]
    pub child_multiplier: Option<f64>,
}

/// Largest column count a seat code can address (`A`..=`Z`).
pub const MAX_SEAT_COLUMNS: i32 = 26;

/// Capacity and occupancy of one cabin class on one flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeatPool {
    pub flight_id: Uuid,
    pub class: SeatClass,
    pub class_multiplier: Multiplier,
    pub child_multiplier: Multiplier,
    pub max_row: i32,
    pub max_col: i32,
    pub occupied: i32,
}

impl SeatPool {
    /// `max_row * max_col`, saturating at `i32::MAX` for rows that did not
    /// come through provisioning.
    pub fn capacity(&self) -> i32 {
        self.max_row.saturating_mul(self.max_col)
    }

    pub fn available(&self) -> i32 {
        self.capacity().saturating_sub(self.occupied)
    }

    pub fn has_free_seat(&self) -> bool {
        self.occupied < self.capacity()
    }
}

/// Read model of a pool for reporting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatPoolOccupancy {
    pub class: SeatClass,
    pub capacity: i32,
    pub occupied: i32,
    pub available: i32,
}

impl From<&SeatPool> for SeatPoolOccupancy {
    fn from(pool: &SeatPool) -> Self {
        Self {
            class: pool.class,
            capacity: pool.capacity(),
            occupied: pool.occupied,
            available: pool.available(),
        }
    }
}
