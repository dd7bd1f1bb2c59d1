//! Parkgate - parking lot occupancy service

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parkgate::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{SqlxAccessTokenRepository, SqlxParkingSpotRepository},
    },
    services::{AccessGate, LotService},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parkgate=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Parkgate...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Initialize services
    let access_gate = Arc::new(AccessGate::with_token_ttl(
        SqlxAccessTokenRepository::boxed(pool.clone()),
        config.auth.token_ttl_minutes,
    ));
    let lot_service = Arc::new(LotService::new(SqlxParkingSpotRepository::boxed(
        pool.clone(),
    )));

    // Every start begins with an empty lot
    lot_service.seed(config.lot.capacity).await?;

    let state = AppState {
        pool,
        access_gate,
        lot_service,
    };

    let app = api::build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
