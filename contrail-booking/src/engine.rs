use chrono::Utc;
use contrail_core::booking::{
    Booking, BookingReceipt, BookingStatus, CreateBookingRequest, SeatChange, Ticket, TicketStatus,
};
use contrail_core::error::{BookingError, BookingResult};
use contrail_core::flight::{Flight, FlightSpec, FlightStatus, SeatClassSpec, SeatPoolOccupancy};
use contrail_core::money::Multiplier;
use contrail_core::notify::NotificationDispatcher;
use contrail_core::payment::{PaymentAdapter, PaymentIntent};
use contrail_core::repository::BookingStore;
use contrail_shared::models::events::{BookingConfirmedEvent, BookingCreatedEvent, TicketCancelledEvent};
use contrail_shared::BookingNotification;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cancellation::CancellationReversor;
use crate::orchestrator::BookingOrchestrator;
use crate::payment::PaymentOrchestrator;
use crate::pricing::FarePolicy;
use crate::provisioner::FlightProvisioner;
use crate::reassignment::SeatReassignment;
use crate::transaction::TransactionScope;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Deadline for each unit of work. `None` waits forever.
    pub transaction_timeout: Option<Duration>,
    pub currency: String,
    pub default_child_multiplier: Multiplier,
    pub minor_age_limit: i32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            transaction_timeout: Some(Duration::from_secs(5)),
            currency: "USD".to_string(),
            default_child_multiplier: Multiplier::DEFAULT_CHILD,
            minor_age_limit: 18,
        }
    }
}

/// Entry point for collaborators (HTTP handlers, jobs).
///
/// Every mutating operation runs as one transaction. Notifications and
/// payment calls happen only after commit and never undo it.
pub struct BookingEngine {
    scope: TransactionScope,
    provisioner: FlightProvisioner,
    orchestrator: BookingOrchestrator,
    cancellation: CancellationReversor,
    reassignment: SeatReassignment,
    payments: PaymentOrchestrator,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl BookingEngine {
    pub fn new(
        store: Arc<dyn BookingStore>,
        notifier: Arc<dyn NotificationDispatcher>,
        payment_adapter: Arc<dyn PaymentAdapter>,
        settings: EngineSettings,
    ) -> Self {
        let scope = TransactionScope::new(store, settings.transaction_timeout);
        Self {
            provisioner: FlightProvisioner::new(scope.clone(), settings.default_child_multiplier),
            orchestrator: BookingOrchestrator::new(scope.clone(), FarePolicy::new(settings.minor_age_limit)),
            cancellation: CancellationReversor::new(scope.clone()),
            reassignment: SeatReassignment::new(scope.clone()),
            payments: PaymentOrchestrator::new(payment_adapter, settings.currency),
            notifier,
            scope,
        }
    }

    pub async fn create_flight_with_seats(
        &self,
        spec: FlightSpec,
        economy: SeatClassSpec,
        business: SeatClassSpec,
        first: SeatClassSpec,
    ) -> BookingResult<Flight> {
        self.provisioner
            .create_flight_with_seats(spec, economy, business, first)
            .await
    }

    pub async fn find_flight(&self, flight_id: Uuid) -> BookingResult<Flight> {
        self.scope
            .store()
            .find_flight(flight_id)
            .await?
            .ok_or(BookingError::FlightNotFound(flight_id))
    }

    pub async fn update_flight_status(&self, flight_id: Uuid, status: FlightStatus) -> BookingResult<Flight> {
        if !self.scope.store().update_flight_status(flight_id, status).await? {
            return Err(BookingError::FlightNotFound(flight_id));
        }
        info!("Flight {} is now {}", flight_id, status);
        self.find_flight(flight_id).await
    }

    /// Per-class capacity and occupancy, cabin order.
    pub async fn flight_occupancy(&self, flight_id: Uuid) -> BookingResult<Vec<SeatPoolOccupancy>> {
        self.find_flight(flight_id).await?;
        let pools = self.scope.store().seat_pools(flight_id).await?;
        Ok(pools.iter().map(SeatPoolOccupancy::from).collect())
    }

    pub async fn create_booking(&self, request: CreateBookingRequest) -> BookingResult<BookingReceipt> {
        let receipt = self.orchestrator.create_booking(request).await?;

        self.notify(BookingNotification::BookingCreated(BookingCreatedEvent {
            booking_id: receipt.booking.id,
            booker_email: receipt.booking.booker_email.clone(),
            departure_flight_id: receipt.booking.departure_flight_id,
            return_flight_id: receipt.booking.return_flight_id,
            ticket_ids: receipt.tickets().map(|t| t.id).collect(),
            total_price: receipt.total_price(),
            timestamp: Utc::now().timestamp(),
        }));

        Ok(receipt)
    }

    /// `pending -> confirmed`.
    pub async fn confirm_booking(&self, booking_id: Uuid) -> BookingResult<Booking> {
        let booking = self
            .scope
            .run(move |uow| {
                Box::pin(async move {
                    let mut booking = uow
                        .find_booking_for_update(booking_id)
                        .await?
                        .ok_or(BookingError::BookingNotFound(booking_id))?;

                    if !booking.status.can_transition_to(BookingStatus::Confirmed) {
                        return Err(BookingError::InvalidBookingTransition {
                            from: booking.status,
                            to: BookingStatus::Confirmed,
                        });
                    }

                    let now = Utc::now();
                    uow.update_booking_status(booking.id, BookingStatus::Confirmed, now).await?;
                    booking.status = BookingStatus::Confirmed;
                    booking.updated_at = now;
                    Ok(booking)
                })
            })
            .await?;

        info!("Confirmed booking {}", booking.id);
        self.notify(BookingNotification::BookingConfirmed(BookingConfirmedEvent {
            booking_id: booking.id,
            booker_email: booking.booker_email.clone(),
            timestamp: Utc::now().timestamp(),
        }));

        Ok(booking)
    }

    pub async fn cancel_ticket(&self, ticket_id: Uuid) -> BookingResult<Ticket> {
        let ticket = self.cancellation.cancel_ticket(ticket_id).await?;

        self.notify(BookingNotification::TicketCancelled(TicketCancelledEvent {
            ticket_id: ticket.id,
            booking_id: ticket.booking_id,
            flight_id: ticket.flight_id,
            seat_class: ticket.seat_class.to_string(),
            timestamp: Utc::now().timestamp(),
        }));

        Ok(ticket)
    }

    pub async fn reassign_seat(&self, booking_id: Uuid, ticket_id: Uuid, seat_code: &str) -> BookingResult<Ticket> {
        self.reassignment.reassign_seat(booking_id, ticket_id, seat_code).await
    }

    pub async fn reassign_seats(&self, booking_id: Uuid, changes: Vec<SeatChange>) -> BookingResult<Vec<Ticket>> {
        self.reassignment.reassign_seats(booking_id, changes).await
    }

    pub async fn find_booking(&self, booking_id: Uuid) -> BookingResult<Booking> {
        self.scope
            .store()
            .find_booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    pub async fn find_ticket(&self, ticket_id: Uuid) -> BookingResult<Ticket> {
        self.scope
            .store()
            .find_ticket(ticket_id)
            .await?
            .ok_or(BookingError::TicketNotFound(ticket_id))
    }

    /// Current tickets of a booking, cancelled ones included.
    pub async fn booking_tickets(&self, booking_id: Uuid) -> BookingResult<Vec<Ticket>> {
        self.find_booking(booking_id).await?;
        Ok(self.scope.store().tickets_for_booking(booking_id).await?)
    }

    /// The booking with its tickets split by leg.
    pub async fn booking_with_tickets(&self, booking_id: Uuid) -> BookingResult<BookingReceipt> {
        let booking = self.find_booking(booking_id).await?;
        let tickets = self.scope.store().tickets_for_booking(booking_id).await?;

        let (departure_tickets, return_tickets): (Vec<Ticket>, Vec<Ticket>) = tickets
            .into_iter()
            .partition(|t| t.flight_id == booking.departure_flight_id);

        Ok(BookingReceipt {
            booking,
            departure_tickets,
            return_tickets,
        })
    }

    /// Asks the gateway for an intent over the booking's still-booked tickets.
    pub async fn initialize_payment(&self, booking_id: Uuid) -> BookingResult<PaymentIntent> {
        let receipt = self.booking_with_tickets(booking_id).await?;
        if receipt.booking.status == BookingStatus::Cancelled {
            return Err(BookingError::InvalidRequest(format!(
                "booking {} is cancelled",
                booking_id
            )));
        }

        let amount: i64 = receipt
            .tickets()
            .filter(|t| t.status == TicketStatus::Booked)
            .map(|t| t.price)
            .sum();
        if amount <= 0 {
            return Err(BookingError::InvalidRequest(format!(
                "booking {} has nothing left to pay",
                booking_id
            )));
        }

        let intent = self.payments.initialize_payment(booking_id, amount).await?;
        info!("Payment intent {} created for booking {}", intent.id, booking_id);
        Ok(intent)
    }

    pub async fn payment_status(&self, intent_id: &str) -> BookingResult<PaymentIntent> {
        self.payments.payment_status(intent_id).await
    }

    fn notify(&self, notification: BookingNotification) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.dispatch(&notification).await {
                warn!("Failed to dispatch {}: {}", notification.topic(), e);
            }
        });
    }
}
