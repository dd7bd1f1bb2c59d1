use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{build_router, AppState};
use crate::db::repositories::{
    AccessTokenRepository, SqlxAccessTokenRepository, SqlxParkingSpotRepository,
};
use crate::db::{create_test_pool, migrations, DynDatabasePool};
use crate::models::AccessToken;
use crate::services::{AccessGate, LotService};

async fn setup_state(capacity: u32) -> AppState {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let access_gate = Arc::new(AccessGate::new(SqlxAccessTokenRepository::boxed(
        pool.clone(),
    )));
    let lot_service = Arc::new(LotService::new(SqlxParkingSpotRepository::boxed(
        pool.clone(),
    )));
    lot_service.seed(capacity).await.expect("Failed to seed lot");

    AppState {
        pool,
        access_gate,
        lot_service,
    }
}

async fn setup_server(capacity: u32) -> (TestServer, DynDatabasePool) {
    let state = setup_state(capacity).await;
    let pool = state.pool.clone();
    let server = TestServer::new(build_router(state)).expect("Failed to start test server");
    (server, pool)
}

async fn issue(server: &TestServer, identifier: &str, descriptor: &str) -> HeaderValue {
    let response = server
        .get(&format!("/get_token/{}/{}", identifier, descriptor))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let token = body["access_token"].as_str().unwrap();
    HeaderValue::from_str(&format!("Basic {}", token)).unwrap()
}

fn message(body: &Value) -> &str {
    body["message"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn test_health() {
    let (server, _) = setup_server(1).await;
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "OK" }));
}

#[tokio::test]
async fn test_auth_runs_before_body_extraction() {
    let app = build_router(setup_state(1).await);

    // No token and no body: the gate answers before the Json extractor runs
    let request = Request::builder()
        .method("PUT")
        .uri("/parking/1")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(message(&body), "You are not authorized");
}

#[tokio::test]
async fn test_unknown_route() {
    let (server, _) = setup_server(1).await;
    let response = server.get("/parking").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_token_shape() {
    let (server, _) = setup_server(1).await;
    let before = Utc::now().timestamp();

    let response = server.get("/get_token/test_1/test-mark").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["access_token"], "dGVzdF8xOnRlc3QtbWFyaw==");
    let expires_at = body["expires_at"].as_i64().unwrap();
    assert!(expires_at >= before + 15 * 60);
    assert!(expires_at <= Utc::now().timestamp() + 15 * 60);
}

#[tokio::test]
async fn test_get_token_is_deterministic() {
    let (server, _) = setup_server(1).await;
    let first = issue(&server, "AB1234", "Volvo").await;
    let second = issue(&server, "AB1234", "Volvo").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let (server, _) = setup_server(3).await;

    let response = server.get("/free_spots").await;
    response.assert_status_ok();
    assert_eq!(message(&response.json()), "You are not authorized");

    let response = server
        .get("/free_spots")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Basic bm9wZTpub3Bl"))
        .await;
    assert_eq!(message(&response.json()), "You are not authorized");
}

#[tokio::test]
async fn test_token_without_scheme_is_rejected() {
    let (server, _) = setup_server(3).await;
    let auth = issue(&server, "test_1", "test-mark").await;
    let bare = auth.to_str().unwrap().trim_start_matches("Basic ").to_string();

    let response = server
        .get("/free_spots")
        .add_header(header::AUTHORIZATION, HeaderValue::from_str(&bare).unwrap())
        .await;
    assert_eq!(message(&response.json()), "You are not authorized");
}

#[tokio::test]
async fn test_expired_token() {
    let (server, pool) = setup_server(3).await;
    let repo = SqlxAccessTokenRepository::new(pool);
    repo.upsert(&AccessToken::new(
        "Basic c3RhbGU6dG9rZW4=",
        Utc::now() - Duration::minutes(1),
    ))
    .await
    .unwrap();

    let response = server
        .get("/free_spots")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic c3RhbGU6dG9rZW4="),
        )
        .await;
    response.assert_status_ok();
    assert_eq!(
        message(&response.json()),
        "You are not authorized, token expired"
    );
}

#[tokio::test]
async fn test_unauthorized_mutation_does_not_touch_lot() {
    let (server, _) = setup_server(3).await;

    let response = server
        .put("/parking/1")
        .json(&json!({ "vehicle_number": "sneaky", "vehicle_mark": "x" }))
        .await;
    assert_eq!(message(&response.json()), "You are not authorized");

    let auth = issue(&server, "test_1", "test-mark").await;
    let response = server
        .get("/free_spots")
        .add_header(header::AUTHORIZATION, auth)
        .await;
    response.assert_json(&json!({ "free": 3 }));
}

#[tokio::test]
async fn test_park_and_leave_scenario() {
    let (server, _) = setup_server(10).await;
    let auth = issue(&server, "test_1", "test-mark").await;

    let response = server
        .put("/parking/1")
        .add_header(header::AUTHORIZATION, auth.clone())
        .json(&json!({ "vehicle_number": "test_1", "vehicle_mark": "test-mark" }))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({ "parking spot": 1 }));

    let response = server
        .get("/free_spots")
        .add_header(header::AUTHORIZATION, auth.clone())
        .await;
    response.assert_json(&json!({ "free": 9 }));

    let response = server
        .patch("/leave/1")
        .add_header(header::AUTHORIZATION, auth.clone())
        .await;
    response.assert_json(&json!({ "message": "spot 1 is available" }));

    let response = server
        .get("/free_spots")
        .add_header(header::AUTHORIZATION, auth)
        .await;
    response.assert_json(&json!({ "free": 10 }));
}

#[tokio::test]
async fn test_park_on_taken_spot() {
    let (server, _) = setup_server(3).await;
    let auth = issue(&server, "first", "Volvo").await;

    server
        .put("/parking/2")
        .add_header(header::AUTHORIZATION, auth.clone())
        .json(&json!({ "vehicle_number": "first", "vehicle_mark": "Volvo" }))
        .await
        .assert_json(&json!({ "parking spot": 2 }));

    let response = server
        .put("/parking/2")
        .add_header(header::AUTHORIZATION, auth.clone())
        .json(&json!({ "vehicle_number": "second", "vehicle_mark": "Saab" }))
        .await;
    response.assert_json(&json!({ "message": "This spot is not available!" }));

    let response = server
        .get("/get_all")
        .add_header(header::AUTHORIZATION, auth)
        .await;
    response.assert_json(&json!({ "2": "first" }));
}

#[tokio::test]
async fn test_leave_free_spot() {
    let (server, _) = setup_server(3).await;
    let auth = issue(&server, "A", "B").await;

    let response = server
        .patch("/leave/3")
        .add_header(header::AUTHORIZATION, auth)
        .await;
    response.assert_json(&json!({ "message": "There is no car parked in this spot." }));
}

#[tokio::test]
async fn test_unknown_spot() {
    let (server, _) = setup_server(3).await;
    let auth = issue(&server, "A", "B").await;

    let response = server
        .put("/parking/11")
        .add_header(header::AUTHORIZATION, auth.clone())
        .json(&json!({ "vehicle_number": "A", "vehicle_mark": "B" }))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({ "message": "Parking spot 11 does not exist." }));

    let response = server
        .patch("/leave/0")
        .add_header(header::AUTHORIZATION, auth)
        .await;
    response.assert_json(&json!({ "message": "Parking spot 0 does not exist." }));
}

#[tokio::test]
async fn test_next_free_spot() {
    let (server, _) = setup_server(3).await;
    let auth = issue(&server, "A", "B").await;

    let response = server
        .get("/next_free_spot")
        .add_header(header::AUTHORIZATION, auth.clone())
        .await;
    response.assert_json(&json!({ "closest spot": 1 }));

    server
        .put("/parking/1")
        .add_header(header::AUTHORIZATION, auth.clone())
        .json(&json!({ "vehicle_number": "A", "vehicle_mark": "B" }))
        .await
        .assert_status_ok();

    let response = server
        .get("/next_free_spot")
        .add_header(header::AUTHORIZATION, auth.clone())
        .await;
    response.assert_json(&json!({ "closest spot": 2 }));

    for (spot, vehicle) in [(2, "C"), (3, "D")] {
        server
            .put(&format!("/parking/{}", spot))
            .add_header(header::AUTHORIZATION, auth.clone())
            .json(&json!({ "vehicle_number": vehicle, "vehicle_mark": "x" }))
            .await
            .assert_status_ok();
    }

    let response = server
        .get("/next_free_spot")
        .add_header(header::AUTHORIZATION, auth)
        .await;
    response.assert_json(&json!({ "message": "There are no free spots in a parking lot." }));
}

#[tokio::test]
async fn test_get_parking_spot() {
    let (server, _) = setup_server(5).await;
    let auth = issue(&server, "AB1234", "Volvo").await;

    server
        .put("/parking/4")
        .add_header(header::AUTHORIZATION, auth.clone())
        .json(&json!({ "vehicle_number": "AB1234", "vehicle_mark": "Volvo" }))
        .await
        .assert_status_ok();

    let response = server
        .get("/get_parking_spot/AB1234")
        .add_header(header::AUTHORIZATION, auth.clone())
        .await;
    response.assert_json(&json!({ "AB1234": 4 }));

    let response = server
        .get("/get_parking_spot/ZZ9999")
        .add_header(header::AUTHORIZATION, auth)
        .await;
    response.assert_json(&json!({
        "message": "There is no car with this vehicle number in a parking lot."
    }));
}

#[tokio::test]
async fn test_get_all() {
    let (server, _) = setup_server(5).await;
    let auth = issue(&server, "A", "B").await;

    let response = server
        .get("/get_all")
        .add_header(header::AUTHORIZATION, auth.clone())
        .await;
    response.assert_json(&json!({ "message": "There are no cars parked in this parking lot." }));

    for (spot, vehicle) in [(5, "E"), (1, "A")] {
        server
            .put(&format!("/parking/{}", spot))
            .add_header(header::AUTHORIZATION, auth.clone())
            .json(&json!({ "vehicle_number": vehicle, "vehicle_mark": "x" }))
            .await
            .assert_status_ok();
    }

    let response = server
        .get("/get_all")
        .add_header(header::AUTHORIZATION, auth)
        .await;
    response.assert_json(&json!({ "1": "A", "5": "E" }));
}

#[tokio::test]
async fn test_change_to_free_spot() {
    let (server, _) = setup_server(3).await;
    let auth = issue(&server, "V", "Volvo").await;
    let body = json!({ "vehicle_number": "V", "vehicle_mark": "Volvo" });

    server
        .put("/parking/1")
        .add_header(header::AUTHORIZATION, auth.clone())
        .json(&body)
        .await
        .assert_status_ok();

    let response = server
        .put("/change_to/2")
        .add_header(header::AUTHORIZATION, auth.clone())
        .json(&body)
        .await;
    response.assert_json(&json!({ "message": "V parked to 2" }));

    let response = server
        .get("/get_all")
        .add_header(header::AUTHORIZATION, auth)
        .await;
    response.assert_json(&json!({ "2": "V" }));
}

#[tokio::test]
async fn test_change_to_taken_spot_keeps_original() {
    let (server, _) = setup_server(3).await;
    let auth = issue(&server, "V", "Volvo").await;

    for (spot, vehicle) in [(1, "V"), (2, "W")] {
        server
            .put(&format!("/parking/{}", spot))
            .add_header(header::AUTHORIZATION, auth.clone())
            .json(&json!({ "vehicle_number": vehicle, "vehicle_mark": "x" }))
            .await
            .assert_status_ok();
    }

    let response = server
        .put("/change_to/2")
        .add_header(header::AUTHORIZATION, auth.clone())
        .json(&json!({ "vehicle_number": "V", "vehicle_mark": "x" }))
        .await;
    response.assert_json(&json!({ "message": "This spot is not available!" }));

    let response = server
        .get("/get_all")
        .add_header(header::AUTHORIZATION, auth)
        .await;
    response.assert_json(&json!({ "1": "V", "2": "W" }));
}

#[tokio::test]
async fn test_change_to_unparked_vehicle() {
    let (server, _) = setup_server(3).await;
    let auth = issue(&server, "ghost", "none").await;

    let response = server
        .put("/change_to/2")
        .add_header(header::AUTHORIZATION, auth)
        .json(&json!({ "vehicle_number": "ghost", "vehicle_mark": "none" }))
        .await;
    response.assert_json(&json!({ "message": "Car ghost not parked." }));
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let (server, _) = setup_server(3).await;
    let auth = issue(&server, "A", "B").await;

    let response = server
        .put("/parking/1")
        .add_header(header::AUTHORIZATION, auth)
        .json(&json!({ "vehicle_number": "A" }))
        .await;
    assert!(response.status_code().is_client_error());
    assert_ne!(response.status_code(), StatusCode::OK);
}
