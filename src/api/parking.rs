//! Lot endpoints
//!
//! All routes here sit behind `require_token`:
//! - GET /free_spots
//! - GET /next_free_spot
//! - GET /get_parking_spot/{identifier}
//! - GET /get_all
//! - PUT /parking/{spot_number}
//! - PATCH /leave/{spot_number}
//! - PUT /change_to/{spot_number}

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Map, Value};

use crate::api::middleware::{ApiError, AppState};
use crate::models::Vehicle;

/// GET /free_spots
pub async fn free_spots(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let free = state.lot_service.count_free().await?;
    Ok(Json(json!({ "free": free })))
}

/// GET /next_free_spot
pub async fn next_free_spot(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let spot_number = state.lot_service.nearest_free().await?;
    Ok(Json(json!({ "closest spot": spot_number })))
}

/// GET /get_parking_spot/{identifier}
///
/// Responds with the vehicle number as the key.
pub async fn get_parking_spot(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let spot_number = state.lot_service.find_spot_by_occupant(&identifier).await?;

    let mut body = Map::new();
    body.insert(identifier, Value::from(spot_number));
    Ok(Json(Value::Object(body)))
}

/// GET /get_all
pub async fn get_all(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let occupied = state.lot_service.list_occupied().await?;
    Ok(Json(occupied))
}

/// PUT /parking/{spot_number}
pub async fn park(
    State(state): State<AppState>,
    Path(spot_number): Path<i64>,
    Json(vehicle): Json<Vehicle>,
) -> Result<impl IntoResponse, ApiError> {
    let spot_number = state.lot_service.occupy(spot_number, vehicle).await?;
    Ok(Json(json!({ "parking spot": spot_number })))
}

/// PATCH /leave/{spot_number}
pub async fn leave(
    State(state): State<AppState>,
    Path(spot_number): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let spot_number = state.lot_service.vacate(spot_number).await?;
    Ok(Json(json!({
        "message": format!("spot {} is available", spot_number)
    })))
}

/// PUT /change_to/{spot_number}
pub async fn change_to(
    State(state): State<AppState>,
    Path(spot_number): Path<i64>,
    Json(vehicle): Json<Vehicle>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.lot_service.relocate(vehicle, spot_number).await?;
    Ok(Json(json!({ "message": message })))
}
