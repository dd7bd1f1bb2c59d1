//! Token issuance endpoint
//!
//! - GET /get_token/{identifier}/{descriptor}

use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::middleware::{ApiError, AppState};
use crate::services::IssuedToken;

/// GET /get_token/{identifier}/{descriptor}
pub async fn get_token(
    State(state): State<AppState>,
    Path((identifier, descriptor)): Path<(String, String)>,
) -> Result<Json<IssuedToken>, ApiError> {
    let issued = state
        .access_gate
        .issue_token(&identifier, &descriptor)
        .await?;
    Ok(Json(issued))
}
