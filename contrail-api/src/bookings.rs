use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Extension, Json, Router,
};
use contrail_core::booking::{
    Booking, BookingReceipt, CreateBookingRequest, PassengerTicketSpec, SeatChange, Ticket, TripType,
};
use contrail_core::payment::PaymentIntent;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::{customer_auth_middleware, Claims};
use crate::state::AppState;

/// The booker is taken from the token, never from the body.
#[derive(Debug, Deserialize)]
pub struct BookingBody {
    pub trip_type: TripType,
    pub departure_flight_id: Uuid,
    #[serde(default)]
    pub return_flight_id: Option<Uuid>,
    pub passengers: Vec<PassengerTicketSpec>,
}

#[derive(Debug, Deserialize)]
pub struct SeatBody {
    pub seat_code: String,
}

#[derive(Debug, Deserialize)]
pub struct SeatBatchBody {
    pub changes: Vec<SeatChange>,
}

#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub intent_id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{booking_id}", get(get_booking))
        .route("/v1/bookings/{booking_id}/confirm", post(confirm_booking))
        .route("/v1/bookings/{booking_id}/payment-intent", post(create_payment_intent))
        .route("/v1/bookings/{booking_id}/seats", put(reassign_seats))
        .route("/v1/bookings/{booking_id}/tickets/{ticket_id}/seat", put(reassign_seat))
        .route("/v1/payments/{intent_id}", get(get_payment))
        .route_layer(from_fn_with_state(state, customer_auth_middleware))
}

/// Loads a booking the caller may act on. Admins may act on any booking.
pub(crate) async fn owned_booking(state: &AppState, claims: &Claims, booking_id: Uuid) -> Result<Booking, AppError> {
    let booking = state.engine.find_booking(booking_id).await?;
    if !claims.is_admin() && !booking.booker_email.eq_ignore_ascii_case(&claims.email) {
        return Err(AppError::AuthorizationError(
            "Booking does not belong to you".to_string(),
        ));
    }
    Ok(booking)
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<BookingBody>,
) -> Result<(StatusCode, Json<BookingReceipt>), AppError> {
    let request = CreateBookingRequest {
        booker_email: claims.email.clone(),
        trip_type: body.trip_type,
        departure_flight_id: body.departure_flight_id,
        return_flight_id: body.return_flight_id,
        passengers: body.passengers,
    };

    let receipt = state.engine.create_booking(request).await?;
    info!("Booking {} placed by {}", receipt.booking.id, claims.sub);

    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingReceipt>, AppError> {
    owned_booking(&state, &claims, booking_id).await?;
    Ok(Json(state.engine.booking_with_tickets(booking_id).await?))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    owned_booking(&state, &claims, booking_id).await?;
    Ok(Json(state.engine.confirm_booking(booking_id).await?))
}

async fn create_payment_intent(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<PaymentIntentResponse>, AppError> {
    owned_booking(&state, &claims, booking_id).await?;
    let intent = state.engine.initialize_payment(booking_id).await?;

    Ok(Json(PaymentIntentResponse {
        intent_id: intent.id,
        client_secret: intent.client_secret,
        amount: intent.amount,
        currency: intent.currency,
    }))
}

async fn reassign_seats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<SeatBatchBody>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    owned_booking(&state, &claims, booking_id).await?;
    Ok(Json(state.engine.reassign_seats(booking_id, body.changes).await?))
}

async fn reassign_seat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((booking_id, ticket_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<SeatBody>,
) -> Result<Json<Ticket>, AppError> {
    owned_booking(&state, &claims, booking_id).await?;
    Ok(Json(
        state
            .engine
            .reassign_seat(booking_id, ticket_id, &body.seat_code)
            .await?,
    ))
}

async fn get_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(intent_id): Path<String>,
) -> Result<Json<PaymentIntent>, AppError> {
    let intent = state.engine.payment_status(&intent_id).await?;
    owned_booking(&state, &claims, intent.booking_id).await?;
    Ok(Json(intent))
}
