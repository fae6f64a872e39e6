use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use contrail_core::error::{BookingError, ErrorKind};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    Booking(BookingError),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::AuthenticationError(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            AppError::AuthorizationError(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::Booking(err) => match err.kind() {
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                ErrorKind::ValidationFailed => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
                ErrorKind::CapacityExceeded => (StatusCode::CONFLICT, "CAPACITY_EXCEEDED"),
                ErrorKind::IllegalStateTransition => (StatusCode::CONFLICT, "ILLEGAL_STATE_TRANSITION"),
                ErrorKind::TransactionAborted => (StatusCode::SERVICE_UNAVAILABLE, "TRANSACTION_ABORTED"),
                ErrorKind::ExternalService => (StatusCode::BAD_GATEWAY, "EXTERNAL_SERVICE"),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let error_message = match self {
            AppError::AuthenticationError(msg) | AppError::AuthorizationError(msg) => msg,
            AppError::Booking(err) => {
                if err.is_retryable() {
                    tracing::warn!("Retryable booking failure: {}", err);
                }
                err.to_string()
            }
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        Self::Booking(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contrail_core::flight::SeatClass;
    use uuid::Uuid;

    #[test]
    fn test_kinds_map_to_stable_statuses() {
        let id = Uuid::new_v4();
        let cases = [
            (BookingError::TicketNotFound(id), StatusCode::NOT_FOUND),
            (BookingError::InvalidTripType("x".into()), StatusCode::BAD_REQUEST),
            (
                BookingError::NoSeatsAvailable { flight_id: id, class: SeatClass::First },
                StatusCode::CONFLICT,
            ),
            (
                BookingError::SeatOccupied { flight_id: id, seat_code: "3C".into() },
                StatusCode::CONFLICT,
            ),
            (BookingError::TransactionAborted("deadlock".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
