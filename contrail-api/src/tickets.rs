use axum::{
    extract::{Path, State},
    middleware::from_fn_with_state,
    routing::post,
    Extension, Json, Router,
};
use contrail_core::booking::Ticket;
use uuid::Uuid;

use crate::bookings::owned_booking;
use crate::error::AppError;
use crate::middleware::{customer_auth_middleware, Claims};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/tickets/{ticket_id}/cancel", post(cancel_ticket))
        .route_layer(from_fn_with_state(state, customer_auth_middleware))
}

async fn cancel_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Ticket>, AppError> {
    let ticket = state.engine.find_ticket(ticket_id).await?;
    owned_booking(&state, &claims, ticket.booking_id).await?;

    Ok(Json(state.engine.cancel_ticket(ticket_id).await?))
}
