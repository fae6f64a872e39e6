use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use contrail_api::{
    app,
    middleware::Claims,
    state::{AppState, AuthConfig},
};
use contrail_booking::{BookingEngine, EngineSettings, MockPaymentAdapter};
use contrail_store::{InMemoryBookingStore, LogNotifier};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "test-secret";

fn test_app() -> Router {
    let engine = BookingEngine::new(
        Arc::new(InMemoryBookingStore::new()),
        Arc::new(LogNotifier),
        Arc::new(MockPaymentAdapter),
        EngineSettings::default(),
    );

    app(AppState {
        engine: Arc::new(engine),
        auth: AuthConfig {
            secret: SECRET.to_string(),
            expiration: 3600,
        },
    })
}

fn token(email: &str, role: &str) -> String {
    token_valid_for(email, role, Duration::minutes(30))
}

fn token_valid_for(email: &str, role: &str, lifetime: Duration) -> String {
    let claims = Claims {
        sub: format!("user-{}", email),
        email: email.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + lifetime).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

async fn call(app: &Router, method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn cabin(max_row: i32, max_col: i32, multiplier: f64) -> Value {
    json!({ "max_row": max_row, "max_col": max_col, "multiplier": multiplier })
}

async fn create_flight(app: &Router, economy_seats: i32) -> String {
    let departs = Utc.with_ymd_and_hms(2030, 9, 2, 6, 30, 0).unwrap();
    let (status, body) = call(
        app,
        Method::POST,
        "/v1/flights",
        Some(&token("ops@contrail.test", "ADMIN")),
        Some(json!({
            "flight": {
                "flight_number": "VN600",
                "aircraft_type": "A350",
                "departure_airport": "SGN",
                "arrival_airport": "HAN",
                "departure_city": "Ho Chi Minh City",
                "arrival_city": "Ha Noi",
                "scheduled_departure": departs,
                "scheduled_arrival": departs + Duration::hours(2),
                "base_price": 1200000
            },
            "economy": cabin(1, economy_seats, 1.0),
            "business": cabin(2, 4, 1.5),
            "first": cabin(1, 2, 2.5)
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().to_string()
}

fn passenger(seat_class: &str) -> Value {
    json!({
        "seat_class": seat_class,
        "owner": {
            "first_name": "Lan",
            "last_name": "Nguyen",
            "phone_number": "0900000001",
            "gender": "female",
            "date_of_birth": "1992-04-30",
            "passport_number": "B7654321",
            "identification_number": null,
            "address": null
        }
    })
}

#[tokio::test]
async fn test_booking_lifecycle_over_http() {
    let app = test_app();
    let flight_id = create_flight(&app, 1).await;
    let customer = token("lan@example.com", "CUSTOMER");

    let (status, receipt) = call(
        &app,
        Method::POST,
        "/v1/bookings",
        Some(&customer),
        Some(json!({
            "trip_type": "oneWay",
            "departure_flight_id": flight_id,
            "passengers": [passenger("economy")]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", receipt);
    assert_eq!(receipt["booking"]["booker_email"], "lan@example.com");
    assert_eq!(receipt["booking"]["status"], "pending");
    assert_eq!(receipt["departure_tickets"][0]["price"], 1200000);

    let booking_id = receipt["booking"]["id"].as_str().unwrap().to_string();
    let ticket_id = receipt["departure_tickets"][0]["id"].as_str().unwrap().to_string();

    // Cabin is full now.
    let (status, body) = call(
        &app,
        Method::POST,
        "/v1/bookings",
        Some(&customer),
        Some(json!({
            "trip_type": "oneWay",
            "departure_flight_id": flight_id,
            "passengers": [passenger("economy")]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CAPACITY_EXCEEDED");

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/v1/bookings/{}/tickets/{}/seat", booking_id, ticket_id),
        Some(&customer),
        Some(json!({ "seat_code": "4a" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["seat_code"], "4A");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/v1/bookings/{}/payment-intent", booking_id),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], 1200000);
    assert_eq!(body["currency"], "USD");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/v1/bookings/{}/confirm", booking_id),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/v1/tickets/{}/cancel", ticket_id),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/v1/tickets/{}/cancel", ticket_id),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ILLEGAL_STATE_TRANSITION");

    let (status, body) = call(&app, Method::GET, &format!("/v1/flights/{}/occupancy", flight_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let economy = body
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["class"] == "economy")
        .unwrap();
    assert_eq!(economy["occupied"], 0);
}

#[tokio::test]
async fn test_validation_and_not_found_statuses() {
    let app = test_app();
    let flight_id = create_flight(&app, 6).await;
    let customer = token("lan@example.com", "CUSTOMER");

    let (status, body) = call(
        &app,
        Method::POST,
        "/v1/bookings",
        Some(&customer),
        Some(json!({
            "trip_type": "roundTrip",
            "departure_flight_id": flight_id,
            "passengers": [passenger("economy")]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/v1/flights/{}", uuid::Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_auth_is_enforced() {
    let app = test_app();
    let flight_id = create_flight(&app, 6).await;
    let body = json!({
        "trip_type": "oneWay",
        "departure_flight_id": flight_id,
        "passengers": [passenger("economy")]
    });

    let (status, _) = call(&app, Method::POST, "/v1/bookings", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, Method::POST, "/v1/bookings", Some("not-a-jwt"), Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Signed correctly but valid for longer than the configured hour.
    let long_lived = token_valid_for("lan@example.com", "CUSTOMER", Duration::days(30));
    let (status, _) = call(&app, Method::POST, "/v1/bookings", Some(&long_lived), Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = token_valid_for("lan@example.com", "CUSTOMER", Duration::hours(-2));
    let (status, _) = call(&app, Method::POST, "/v1/bookings", Some(&expired), Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Customers cannot provision flights.
    let (status, _) = call(
        &app,
        Method::PATCH,
        &format!("/v1/flights/{}/status", flight_id),
        Some(&token("lan@example.com", "CUSTOMER")),
        Some(json!({ "status": "delayed" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Someone else's booking is off limits.
    let (_, receipt) = call(
        &app,
        Method::POST,
        "/v1/bookings",
        Some(&token("lan@example.com", "CUSTOMER")),
        Some(body),
    )
    .await;
    let booking_id = receipt["booking"]["id"].as_str().unwrap();

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/v1/bookings/{}", booking_id),
        Some(&token("mallory@example.com", "CUSTOMER")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/v1/bookings/{}", booking_id),
        Some(&token("ops@contrail.test", "ADMIN")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_delayed_flight_refuses_bookings() {
    let app = test_app();
    let flight_id = create_flight(&app, 6).await;

    let (status, body) = call(
        &app,
        Method::PATCH,
        &format!("/v1/flights/{}/status", flight_id),
        Some(&token("ops@contrail.test", "ADMIN")),
        Some(json!({ "status": "delayed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "delayed");

    let (status, _) = call(
        &app,
        Method::POST,
        "/v1/bookings",
        Some(&token("lan@example.com", "CUSTOMER")),
        Some(json!({
            "trip_type": "oneWay",
            "departure_flight_id": flight_id,
            "passengers": [passenger("business")]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
