use contrail_core::booking::{Booking, BookingReceipt, CreateBookingRequest, Ticket, TripLeg, TripType};
use contrail_core::error::{BookingError, BookingResult};
use contrail_core::flight::{Flight, SeatClass, SeatPool};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::pricing::FarePolicy;
use crate::transaction::TransactionScope;

/// Validates booking requests and turns them into a booking plus tickets.
pub struct BookingOrchestrator {
    scope: TransactionScope,
    fares: FarePolicy,
}

/// One flight of a booking with the pools it will draw from.
struct Leg {
    kind: TripLeg,
    flight: Flight,
    pools: Vec<SeatPool>,
}

impl Leg {
    fn pool(&self, class: SeatClass) -> Option<&SeatPool> {
        self.pools.iter().find(|p| p.class == class)
    }
}

impl BookingOrchestrator {
    pub fn new(scope: TransactionScope, fares: FarePolicy) -> Self {
        Self { scope, fares }
    }

    pub async fn create_booking(&self, request: CreateBookingRequest) -> BookingResult<BookingReceipt> {
        if request.booker_email.trim().is_empty() {
            return Err(BookingError::InvalidRequest("booker email is required".into()));
        }
        if request.passengers.is_empty() {
            return Err(BookingError::InvalidRequest("at least one passenger is required".into()));
        }

        let store = self.scope.store();

        let departure = store
            .find_flight(request.departure_flight_id)
            .await?
            .ok_or(BookingError::FlightNotFound(request.departure_flight_id))?;

        let return_flight = match (request.trip_type, request.return_flight()) {
            (TripType::RoundTrip, None) => {
                return Err(BookingError::InvalidTripType(
                    "round trip requires a return flight".into(),
                ))
            }
            (TripType::RoundTrip, Some(id)) if id == departure.id => {
                return Err(BookingError::InvalidTripType(
                    "return flight must differ from the departure flight".into(),
                ))
            }
            (TripType::RoundTrip, Some(id)) => Some(
                store
                    .find_flight(id)
                    .await?
                    .ok_or(BookingError::FlightNotFound(id))?,
            ),
            (TripType::OneWay, Some(_)) => {
                return Err(BookingError::InvalidTripType(
                    "one-way booking cannot carry a return flight".into(),
                ))
            }
            (TripType::OneWay, None) => None,
        };

        if return_flight.is_none() && request.passengers.iter().any(|p| p.return_seat_class.is_some()) {
            return Err(BookingError::InvalidTripType(
                "one-way booking cannot carry a return cabin".into(),
            ));
        }

        if !departure.status.accepts_bookings() {
            return Err(BookingError::FlightNotBookable {
                flight_id: departure.id,
                status: departure.status,
            });
        }

        let outbound = Leg {
            kind: TripLeg::Departure,
            pools: store.seat_pools(departure.id).await?,
            flight: departure,
        };
        let inbound = match return_flight {
            Some(flight) => Some(Leg {
                kind: TripLeg::Return,
                pools: store.seat_pools(flight.id).await?,
                flight,
            }),
            None => None,
        };

        // Fail fast on an obviously full cabin. The authoritative check is the
        // conditional increment inside the transaction.
        for leg in std::iter::once(&outbound).chain(inbound.iter()) {
            let mut wanted: BTreeMap<SeatClass, i32> = BTreeMap::new();
            for pax in &request.passengers {
                *wanted.entry(pax.class_for(leg.kind)).or_insert(0) += 1;
            }
            for (class, count) in &wanted {
                let available = leg.pool(*class).map(|p| p.available()).unwrap_or(0);
                if available < *count {
                    return Err(BookingError::NoSeatsAvailable {
                        flight_id: leg.flight.id,
                        class: *class,
                    });
                }
            }
        }

        let booking = Booking::new(
            request.booker_email.trim().to_string(),
            request.trip_type,
            outbound.flight.id,
            inbound.as_ref().map(|leg| leg.flight.id),
        );

        let departure_tickets = self.issue_tickets(&booking, &outbound, &request)?;
        let return_tickets = match &inbound {
            Some(leg) => self.issue_tickets(&booking, leg, &request)?,
            None => Vec::new(),
        };

        let receipt = BookingReceipt {
            booking,
            departure_tickets,
            return_tickets,
        };

        // Pools are locked in (flight, class) order, whatever the order of
        // legs and passengers, so two bookings never wait on each other.
        let mut seats: BTreeMap<(Uuid, SeatClass), i32> = BTreeMap::new();
        for ticket in receipt.tickets() {
            *seats.entry((ticket.flight_id, ticket.seat_class)).or_insert(0) += 1;
        }

        let receipt = self
            .scope
            .run(move |uow| {
                Box::pin(async move {
                    for (&(flight_id, class), &count) in &seats {
                        for _ in 0..count {
                            if !uow.try_occupy_seat(flight_id, class).await? {
                                debug!("{} on {} sold out mid-booking", class, flight_id);
                                return Err(BookingError::NoSeatsAvailable { flight_id, class });
                            }
                        }
                    }

                    uow.insert_booking(&receipt.booking).await?;
                    for ticket in receipt.tickets() {
                        uow.insert_ticket(ticket).await?;
                    }
                    Ok(receipt)
                })
            })
            .await?;

        info!(
            "Created booking {} with {} ticket(s), total {}",
            receipt.booking.id,
            receipt.departure_tickets.len() + receipt.return_tickets.len(),
            receipt.total_price()
        );
        Ok(receipt)
    }

    fn issue_tickets(&self, booking: &Booking, leg: &Leg, request: &CreateBookingRequest) -> BookingResult<Vec<Ticket>> {
        request
            .passengers
            .iter()
            .map(|pax| {
                let class = pax.class_for(leg.kind);
                let pool = leg.pool(class).ok_or(BookingError::NoSeatsAvailable {
                    flight_id: leg.flight.id,
                    class,
                })?;
                let price = self.fares.ticket_price(&leg.flight, pool, &pax.owner);
                Ok(Ticket::issue(booking.id, leg.flight.id, class, price, pax.owner.clone()))
            })
            .collect()
    }
}
