use chrono::Utc;
use contrail_core::booking::{SeatChange, Ticket, TicketStatus};
use contrail_core::error::{BookingError, BookingResult};
use contrail_core::repository::UnitOfWork;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use crate::seat_map::{SeatCode, SeatMap};
use crate::transaction::TransactionScope;

/// Moves tickets onto specific physical seats.
pub struct SeatReassignment {
    scope: TransactionScope,
}

impl SeatReassignment {
    pub fn new(scope: TransactionScope) -> Self {
        Self { scope }
    }

    pub async fn reassign_seat(&self, booking_id: Uuid, ticket_id: Uuid, seat_code: &str) -> BookingResult<Ticket> {
        let mut tickets = self
            .reassign_seats(
                booking_id,
                vec![SeatChange {
                    ticket_id,
                    seat_code: seat_code.to_string(),
                }],
            )
            .await?;

        tickets
            .pop()
            .ok_or_else(|| BookingError::TransactionAborted("reassignment returned no ticket".into()))
    }

    /// Applies every change or none.
    ///
    /// All old seats of the batch are released before any new one is
    /// claimed, so two tickets of a booking can swap seats.
    pub async fn reassign_seats(&self, booking_id: Uuid, changes: Vec<SeatChange>) -> BookingResult<Vec<Ticket>> {
        if changes.is_empty() {
            return Err(BookingError::InvalidRequest("no seat changes given".into()));
        }

        let mut seen_tickets = HashSet::new();
        for change in &changes {
            SeatCode::parse(&change.seat_code)?;
            if !seen_tickets.insert(change.ticket_id) {
                return Err(BookingError::InvalidRequest(format!(
                    "ticket {} appears more than once",
                    change.ticket_id
                )));
            }
        }

        self.scope
            .store()
            .find_booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;

        let count = changes.len();
        let tickets = self
            .scope
            .run(move |uow| Box::pin(async move { apply_changes(uow, booking_id, changes).await }))
            .await?;

        info!("Reassigned {} seat(s) on booking {}", count, booking_id);
        Ok(tickets)
    }
}

async fn apply_changes(
    uow: &mut dyn UnitOfWork,
    booking_id: Uuid,
    changes: Vec<SeatChange>,
) -> BookingResult<Vec<Ticket>> {
    let now = Utc::now();

    // Tickets are locked in id order and seats claimed in (flight, code)
    // order so overlapping batches cannot deadlock. Results keep the
    // caller's order.
    let mut ordered: Vec<(usize, SeatChange)> = changes.into_iter().enumerate().collect();
    ordered.sort_by_key(|(_, change)| change.ticket_id);

    let mut staged: Vec<(usize, Ticket, String)> = Vec::with_capacity(ordered.len());
    let mut targets = HashSet::new();

    for (position, change) in ordered {
        let ticket = uow
            .find_ticket_for_update(change.ticket_id)
            .await?
            .ok_or(BookingError::TicketNotFound(change.ticket_id))?;

        if ticket.booking_id != booking_id {
            return Err(BookingError::TicketNotInBooking {
                ticket_id: ticket.id,
                booking_id,
            });
        }
        if ticket.status != TicketStatus::Booked {
            return Err(BookingError::TicketNotReassignable {
                ticket_id: ticket.id,
                status: ticket.status,
            });
        }

        uow.find_flight(ticket.flight_id)
            .await?
            .ok_or(BookingError::FlightNotFound(ticket.flight_id))?;
        let map = SeatMap::from_pools(&uow.seat_pools(ticket.flight_id).await?);
        let code = map.check(&change.seat_code, ticket.seat_class)?;

        if !targets.insert((ticket.flight_id, code.clone())) {
            return Err(BookingError::InvalidSeatCode {
                code: change.seat_code,
                reason: "requested twice in the same batch".into(),
            });
        }
        staged.push((position, ticket, code));
    }

    for (_, ticket, _) in &staged {
        if let Some(old) = &ticket.seat_code {
            uow.release_seat_code(ticket.flight_id, old, ticket.id).await?;
        }
    }

    staged.sort_by(|(_, a, a_code), (_, b, b_code)| (a.flight_id, a_code).cmp(&(b.flight_id, b_code)));

    let mut updated = Vec::with_capacity(staged.len());
    for (position, mut ticket, code) in staged {
        if !uow.claim_seat_code(ticket.flight_id, &code, ticket.id).await? {
            return Err(BookingError::SeatOccupied {
                flight_id: ticket.flight_id,
                seat_code: code,
            });
        }
        uow.update_ticket_seat(ticket.id, Some(&code), now).await?;
        ticket.seat_code = Some(code);
        ticket.updated_at = now;
        updated.push((position, ticket));
    }

    updated.sort_by_key(|(position, _)| *position);
    Ok(updated.into_iter().map(|(_, ticket)| ticket).collect())
}
