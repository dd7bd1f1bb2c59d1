//! Parking spot repository
//!
//! One row per physical spot. Rows are created by `reset` and afterwards only
//! updated in place.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::ParkingSpot;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const SPOT_COLUMNS: &str = "spot_number, vehicle_number, vehicle_mark, is_available";

/// Parking spot repository trait
#[async_trait]
pub trait ParkingSpotRepository: Send + Sync {
    /// Number of spots currently available
    async fn count_available(&self) -> Result<i64>;

    /// Lowest-numbered available spot
    async fn first_available(&self) -> Result<Option<ParkingSpot>>;

    /// Lowest-numbered spot occupied by the given vehicle number
    async fn find_by_vehicle_number(&self, vehicle_number: &str) -> Result<Option<ParkingSpot>>;

    /// All occupied spots, ascending by spot number
    async fn list_occupied(&self) -> Result<Vec<ParkingSpot>>;

    /// Get spot by number
    async fn get_by_number(&self, spot_number: i64) -> Result<Option<ParkingSpot>>;

    /// Persist occupant fields and availability. Returns false if no row matched.
    async fn update(&self, spot: &ParkingSpot) -> Result<bool>;

    /// Replace all spots with `capacity` free spots numbered from 1
    async fn reset(&self, capacity: u32) -> Result<()>;
}

/// SQLx-based parking spot repository implementation
pub struct SqlxParkingSpotRepository {
    pool: DynDatabasePool,
}

impl SqlxParkingSpotRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ParkingSpotRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ParkingSpotRepository for SqlxParkingSpotRepository {
    async fn count_available(&self) -> Result<i64> {
        let query = "SELECT COUNT(*) AS free FROM parking_spots WHERE is_available = ?";
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(query)
                .bind(true)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count available spots")?
                .get::<i64, _>("free"),
            DatabaseDriver::Mysql => sqlx::query(query)
                .bind(true)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count available spots")?
                .get::<i64, _>("free"),
        };
        Ok(count)
    }

    async fn first_available(&self) -> Result<Option<ParkingSpot>> {
        let query = format!(
            "SELECT {} FROM parking_spots WHERE is_available = ? ORDER BY spot_number LIMIT 1",
            SPOT_COLUMNS
        );
        let spot = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_one_sqlite(self.pool.sqlite()?, &query, Bind::Flag(true)).await
            }
            DatabaseDriver::Mysql => {
                fetch_one_mysql(self.pool.mysql()?, &query, Bind::Flag(true)).await
            }
        };
        spot.context("Failed to find first available spot")
    }

    async fn find_by_vehicle_number(&self, vehicle_number: &str) -> Result<Option<ParkingSpot>> {
        let query = format!(
            "SELECT {} FROM parking_spots WHERE vehicle_number = ? ORDER BY spot_number LIMIT 1",
            SPOT_COLUMNS
        );
        let spot = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_one_sqlite(self.pool.sqlite()?, &query, Bind::Text(vehicle_number)).await
            }
            DatabaseDriver::Mysql => {
                fetch_one_mysql(self.pool.mysql()?, &query, Bind::Text(vehicle_number)).await
            }
        };
        spot.context("Failed to find spot by vehicle number")
    }

    async fn list_occupied(&self) -> Result<Vec<ParkingSpot>> {
        let query = format!(
            "SELECT {} FROM parking_spots WHERE is_available = ? ORDER BY spot_number",
            SPOT_COLUMNS
        );
        let spots: Vec<ParkingSpot> = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&query)
                .bind(false)
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to list occupied spots")?
                .iter()
                .map(row_to_spot_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&query)
                .bind(false)
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to list occupied spots")?
                .iter()
                .map(row_to_spot_mysql)
                .collect(),
        };
        Ok(spots)
    }

    async fn get_by_number(&self, spot_number: i64) -> Result<Option<ParkingSpot>> {
        let query = format!(
            "SELECT {} FROM parking_spots WHERE spot_number = ?",
            SPOT_COLUMNS
        );
        let spot = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_one_sqlite(self.pool.sqlite()?, &query, Bind::Number(spot_number)).await
            }
            DatabaseDriver::Mysql => {
                fetch_one_mysql(self.pool.mysql()?, &query, Bind::Number(spot_number)).await
            }
        };
        spot.context("Failed to get spot by number")
    }

    async fn update(&self, spot: &ParkingSpot) -> Result<bool> {
        let query = "UPDATE parking_spots SET vehicle_number = ?, vehicle_mark = ?, is_available = ? WHERE spot_number = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(query)
                .bind(&spot.vehicle_number)
                .bind(&spot.vehicle_mark)
                .bind(spot.is_available)
                .bind(spot.spot_number)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to update parking spot")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(query)
                .bind(&spot.vehicle_number)
                .bind(&spot.vehicle_mark)
                .bind(spot.is_available)
                .bind(spot.spot_number)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to update parking spot")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn reset(&self, capacity: u32) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => reset_sqlite(self.pool.sqlite()?, capacity).await,
            DatabaseDriver::Mysql => reset_mysql(self.pool.mysql()?, capacity).await,
        }
    }
}

/// Single bind parameter for the one-row lookups
enum Bind<'a> {
    Flag(bool),
    Text(&'a str),
    Number(i64),
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn fetch_one_sqlite(
    pool: &SqlitePool,
    query: &str,
    bind: Bind<'_>,
) -> Result<Option<ParkingSpot>> {
    let query = sqlx::query(query);
    let query = match bind {
        Bind::Flag(flag) => query.bind(flag),
        Bind::Text(text) => query.bind(text.to_owned()),
        Bind::Number(number) => query.bind(number),
    };
    let row = query.fetch_optional(pool).await?;
    Ok(row.as_ref().map(row_to_spot_sqlite))
}

async fn reset_sqlite(pool: &SqlitePool, capacity: u32) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM parking_spots")
        .execute(&mut *tx)
        .await
        .context("Failed to clear parking spots")?;

    for spot_number in 1..=i64::from(capacity) {
        sqlx::query(
            "INSERT INTO parking_spots (spot_number, vehicle_number, vehicle_mark, is_available) VALUES (?, NULL, NULL, ?)",
        )
        .bind(spot_number)
        .bind(true)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to seed parking spot {}", spot_number))?;
    }

    tx.commit().await.context("Failed to commit parking spot seed")?;
    Ok(())
}

fn row_to_spot_sqlite(row: &sqlx::sqlite::SqliteRow) -> ParkingSpot {
    ParkingSpot {
        spot_number: row.get("spot_number"),
        vehicle_number: row.get("vehicle_number"),
        vehicle_mark: row.get("vehicle_mark"),
        is_available: row.get("is_available"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn fetch_one_mysql(
    pool: &MySqlPool,
    query: &str,
    bind: Bind<'_>,
) -> Result<Option<ParkingSpot>> {
    let query = sqlx::query(query);
    let query = match bind {
        Bind::Flag(flag) => query.bind(flag),
        Bind::Text(text) => query.bind(text.to_owned()),
        Bind::Number(number) => query.bind(number),
    };
    let row = query.fetch_optional(pool).await?;
    Ok(row.as_ref().map(row_to_spot_mysql))
}

async fn reset_mysql(pool: &MySqlPool, capacity: u32) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM parking_spots")
        .execute(&mut *tx)
        .await
        .context("Failed to clear parking spots")?;

    for spot_number in 1..=i64::from(capacity) {
        sqlx::query(
            "INSERT INTO parking_spots (spot_number, vehicle_number, vehicle_mark, is_available) VALUES (?, NULL, NULL, ?)",
        )
        .bind(spot_number)
        .bind(true)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to seed parking spot {}", spot_number))?;
    }

    tx.commit().await.context("Failed to commit parking spot seed")?;
    Ok(())
}

fn row_to_spot_mysql(row: &sqlx::mysql::MySqlRow) -> ParkingSpot {
    ParkingSpot {
        spot_number: row.get("spot_number"),
        vehicle_number: row.get("vehicle_number"),
        vehicle_mark: row.get("vehicle_mark"),
        is_available: row.get("is_available"),
    }
}
