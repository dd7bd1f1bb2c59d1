//! Liveness endpoint
//!
//! - GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::api::middleware::AppState;

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
}

/// GET /health
///
/// Reports `OK` when the database answers a ping.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.pool.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthCheckResponse {
                status: "OK".to_string(),
            }),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthCheckResponse {
                    status: "UNAVAILABLE".to_string(),
                }),
            )
        }
    }
}
