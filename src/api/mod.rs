//! API layer - HTTP handlers and routing
//!
//! Public routes:
//! - GET /get_token/{identifier}/{descriptor}
//! - GET /health
//!
//! Every lot route is wrapped in `middleware::require_token`.

pub mod auth;
pub mod health;
pub mod middleware;
pub mod parking;

#[cfg(test)]
mod tests;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, put},
    Router,
};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState};

/// Build the API routes, still expecting `AppState`
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .route("/free_spots", get(parking::free_spots))
        .route("/next_free_spot", get(parking::next_free_spot))
        .route("/get_parking_spot/{identifier}", get(parking::get_parking_spot))
        .route("/get_all", get(parking::get_all))
        .route("/parking/{spot_number}", put(parking::park))
        .route("/leave/{spot_number}", patch(parking::leave))
        .route("/change_to/{spot_number}", put(parking::change_to))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_token,
        ));

    Router::new()
        .route("/get_token/{identifier}/{descriptor}", get(auth::get_token))
        .route("/health", get(health::health_check))
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    build_api_router(state.clone())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
