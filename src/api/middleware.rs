//! API middleware
//!
//! Contains:
//! - Shared application state
//! - `ApiError`, the single error response type
//! - Token authorization middleware for the lot routes

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::db::DynDatabasePool;
use crate::services::{
    AccessGate, AuthError, LotMutationError, LotQueryError, LotService, RelocateError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub access_gate: Arc<AccessGate>,
    pub lot_service: Arc<LotService>,
}

/// Error response, rendered as `{"message": ...}`.
///
/// Lot and auth conditions are reported with status 200 so existing clients
/// keep reading the message body. Only storage failures use a 5xx status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    /// A reported condition, returned with status 200
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
        }
    }

    /// Log the cause and hide it from the client
    pub fn internal_error(cause: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:#}", cause);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Internal(e) => Self::internal_error(e),
            other => Self::message(other.to_string()),
        }
    }
}

impl From<LotQueryError> for ApiError {
    fn from(err: LotQueryError) -> Self {
        match err {
            LotQueryError::Internal(e) => Self::internal_error(e),
            other => Self::message(other.to_string()),
        }
    }
}

impl From<LotMutationError> for ApiError {
    fn from(err: LotMutationError) -> Self {
        match err {
            LotMutationError::Internal(e) => Self::internal_error(e),
            other => Self::message(other.to_string()),
        }
    }
}

impl From<RelocateError> for ApiError {
    fn from(err: RelocateError) -> Self {
        match err {
            RelocateError::Internal(e) => Self::internal_error(e),
            RelocateError::Mutation(e) => e.into(),
            other => Self::message(other.to_string()),
        }
    }
}

/// Raw `Authorization` header value, untrimmed
fn extract_credential(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Token authorization middleware.
///
/// Rejects the request before any handler or body extractor runs.
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credential = extract_credential(&request);
    state.access_gate.authorize(credential.as_deref()).await?;

    Ok(next.run(request).await)
}
