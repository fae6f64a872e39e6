use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Json, Router,
};
use contrail_core::flight::{Flight, FlightSpec, FlightStatus, SeatClassSpec, SeatPoolOccupancy};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::admin_auth_middleware;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateFlightRequest {
    pub flight: FlightSpec,
    pub economy: SeatClassSpec,
    pub business: SeatClassSpec,
    pub first: SeatClassSpec,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: FlightStatus,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/v1/flights", post(create_flight))
        .route("/v1/flights/{flight_id}/status", patch(update_status))
        .route_layer(from_fn_with_state(state, admin_auth_middleware));

    Router::new()
        .route("/v1/flights/{flight_id}", get(get_flight))
        .route("/v1/flights/{flight_id}/occupancy", get(get_occupancy))
        .merge(admin)
}

async fn create_flight(
    State(state): State<AppState>,
    Json(req): Json<CreateFlightRequest>,
) -> Result<(StatusCode, Json<Flight>), AppError> {
    let flight = state
        .engine
        .create_flight_with_seats(req.flight, req.economy, req.business, req.first)
        .await?;

    Ok((StatusCode::CREATED, Json(flight)))
}

async fn update_status(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Flight>, AppError> {
    let flight = state.engine.update_flight_status(flight_id, req.status).await?;
    Ok(Json(flight))
}

async fn get_flight(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<Flight>, AppError> {
    Ok(Json(state.engine.find_flight(flight_id).await?))
}

async fn get_occupancy(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<Vec<SeatPoolOccupancy>>, AppError> {
    Ok(Json(state.engine.flight_occupancy(flight_id).await?))
}
