use chrono::Utc;
use contrail_core::booking::{Ticket, TicketStatus};
use contrail_core::error::{BookingError, BookingResult};
use tracing::{info, warn};
use uuid::Uuid;

use crate::transaction::TransactionScope;

/// Cancels tickets and gives their seats back to the pool.
pub struct CancellationReversor {
    scope: TransactionScope,
}

impl CancellationReversor {
    pub fn new(scope: TransactionScope) -> Self {
        Self { scope }
    }

    /// `booked -> cancelled`. The status flip, the pool decrement and the
    /// release of any assigned seat commit together.
    pub async fn cancel_ticket(&self, ticket_id: Uuid) -> BookingResult<Ticket> {
        let ticket = self
            .scope
            .store()
            .find_ticket(ticket_id)
            .await?
            .ok_or(BookingError::TicketNotFound(ticket_id))?;
        ensure_cancellable(&ticket)?;

        let cancelled = self
            .scope
            .run(move |uow| {
                Box::pin(async move {
                    // Re-read under lock; a concurrent cancel may have won.
                    let mut ticket = uow
                        .find_ticket_for_update(ticket_id)
                        .await?
                        .ok_or(BookingError::TicketNotFound(ticket_id))?;
                    ensure_cancellable(&ticket)?;

                    let now = Utc::now();
                    uow.update_ticket_status(ticket.id, TicketStatus::Cancelled, now).await?;

                    if !uow.release_seat(ticket.flight_id, ticket.seat_class).await? {
                        warn!(
                            "Pool {} on flight {} had nothing to release for ticket {}",
                            ticket.seat_class, ticket.flight_id, ticket.id
                        );
                        return Err(BookingError::TransactionAborted(format!(
                            "occupancy of {} on flight {} is already zero",
                            ticket.seat_class, ticket.flight_id
                        )));
                    }

                    if let Some(code) = ticket.seat_code.take() {
                        uow.release_seat_code(ticket.flight_id, &code, ticket.id).await?;
                        uow.update_ticket_seat(ticket.id, None, now).await?;
                    }

                    ticket.status = TicketStatus::Cancelled;
                    ticket.updated_at = now;
                    Ok(ticket)
                })
            })
            .await?;

        info!(
            "Cancelled ticket {} of booking {} ({} on {})",
            cancelled.id, cancelled.booking_id, cancelled.seat_class, cancelled.flight_id
        );
        Ok(cancelled)
    }
}

fn ensure_cancellable(ticket: &Ticket) -> BookingResult<()> {
    if ticket.status != TicketStatus::Booked {
        return Err(BookingError::TicketNotCancellable {
            ticket_id: ticket.id,
            status: ticket.status,
        });
    }
    Ok(())
}
