//! Lot registry service
//!
//! Implements the read queries over the lot and the occupy, vacate and
//! relocate mutations. "Nearest" always means lowest spot number.

use crate::db::repositories::ParkingSpotRepository;
use crate::models::Vehicle;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Conditions reported by the read queries
#[derive(Debug, thiserror::Error)]
pub enum LotQueryError {
    #[error("There are no free spots in a parking lot.")]
    NoFreeSpots,

    #[error("There is no car with this vehicle number in a parking lot.")]
    OccupantNotFound,

    #[error("There are no cars parked in this parking lot.")]
    LotEmpty,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error types for occupy and vacate
#[derive(Debug, thiserror::Error)]
pub enum LotMutationError {
    #[error("This spot is not available!")]
    SpotUnavailable,

    #[error("There is no car parked in this spot.")]
    NotOccupied,

    #[error("Parking spot {0} does not exist.")]
    SpotNotFound(i64),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error types for relocate
#[derive(Debug, thiserror::Error)]
pub enum RelocateError {
    /// The vehicle is not parked anywhere in the lot
    #[error("Car {0} not parked.")]
    NotParked(String),

    /// Occupying the target spot failed
    #[error(transparent)]
    Mutation(#[from] LotMutationError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Lot registry service
pub struct LotService {
    repo: Arc<dyn ParkingSpotRepository>,
}

impl LotService {
    pub fn new(repo: Arc<dyn ParkingSpotRepository>) -> Self {
        Self { repo }
    }

    /// Replace the lot with `capacity` free spots numbered from 1.
    ///
    /// Runs once at startup. Issued tokens are left alone.
    pub async fn seed(&self, capacity: u32) -> anyhow::Result<()> {
        if capacity == 0 {
            anyhow::bail!("Lot capacity must be at least 1");
        }
        self.repo.reset(capacity).await?;
        tracing::info!(capacity, "Seeded parking lot");
        Ok(())
    }

    /// Number of free spots
    pub async fn count_free(&self) -> Result<i64, LotQueryError> {
        Ok(self.repo.count_available().await?)
    }

    /// Lowest-numbered free spot
    pub async fn nearest_free(&self) -> Result<i64, LotQueryError> {
        self.repo
            .first_available()
            .await?
            .map(|spot| spot.spot_number)
            .ok_or(LotQueryError::NoFreeSpots)
    }

    /// Spot currently holding the given vehicle
    pub async fn find_spot_by_occupant(&self, vehicle_number: &str) -> Result<i64, LotQueryError> {
        self.repo
            .find_by_vehicle_number(vehicle_number)
            .await?
            .map(|spot| spot.spot_number)
            .ok_or(LotQueryError::OccupantNotFound)
    }

    /// Every occupied spot mapped to its vehicle number, ascending
    pub async fn list_occupied(&self) -> Result<BTreeMap<i64, String>, LotQueryError> {
        let occupied: BTreeMap<i64, String> = self
            .repo
            .list_occupied()
            .await?
            .into_iter()
            .map(|spot| (spot.spot_number, spot.vehicle_number.unwrap_or_default()))
            .collect();

        if occupied.is_empty() {
            return Err(LotQueryError::LotEmpty);
        }
        Ok(occupied)
    }

    /// Park a vehicle in a free spot.
    ///
    /// # Errors
    ///
    /// - `SpotNotFound` if the lot has no such spot
    /// - `SpotUnavailable` if the spot is already taken
    pub async fn occupy(&self, spot_number: i64, vehicle: Vehicle) -> Result<i64, LotMutationError> {
        let mut spot = self
            .repo
            .get_by_number(spot_number)
            .await?
            .ok_or(LotMutationError::SpotNotFound(spot_number))?;

        if !spot.is_available {
            tracing::debug!(spot_number, "Occupy rejected, spot taken");
            return Err(LotMutationError::SpotUnavailable);
        }

        let vehicle_number = vehicle.vehicle_number.clone();
        spot.park(vehicle);
        if !self.repo.update(&spot).await? {
            return Err(LotMutationError::SpotNotFound(spot_number));
        }

        tracing::info!(spot_number, vehicle_number = %vehicle_number, "Vehicle parked");
        Ok(spot_number)
    }

    /// Free an occupied spot.
    ///
    /// # Errors
    ///
    /// - `SpotNotFound` if the lot has no such spot
    /// - `NotOccupied` if the spot is already free
    pub async fn vacate(&self, spot_number: i64) -> Result<i64, LotMutationError> {
        let mut spot = self
            .repo
            .get_by_number(spot_number)
            .await?
            .ok_or(LotMutationError::SpotNotFound(spot_number))?;

        if spot.is_available {
            tracing::debug!(spot_number, "Vacate rejected, spot already free");
            return Err(LotMutationError::NotOccupied);
        }

        spot.clear();
        if !self.repo.update(&spot).await? {
            return Err(LotMutationError::SpotNotFound(spot_number));
        }

        tracing::info!(spot_number, "Spot vacated");
        Ok(spot_number)
    }

    /// Move a parked vehicle to another spot.
    ///
    /// The target is occupied before the old spot is vacated, so a failed
    /// move leaves the original reservation in place. The two steps are not
    /// atomic. Once the target is held the move is reported as done, even if
    /// the old spot could not be freed.
    pub async fn relocate(
        &self,
        vehicle: Vehicle,
        new_spot_number: i64,
    ) -> Result<String, RelocateError> {
        let current = self.find_spot_by_occupant(&vehicle.vehicle_number).await;
        let old_spot_number = match current {
            Ok(spot_number) => spot_number,
            Err(LotQueryError::Internal(e)) => return Err(RelocateError::Internal(e)),
            Err(_) => return Err(RelocateError::NotParked(vehicle.vehicle_number)),
        };

        let vehicle_number = vehicle.vehicle_number.clone();
        self.occupy(new_spot_number, vehicle).await?;
        if let Err(e) = self.vacate(old_spot_number).await {
            tracing::warn!(
                vehicle_number = %vehicle_number,
                spot_number = old_spot_number,
                "Relocated vehicle but could not free previous spot: {}",
                e
            );
        }

        tracing::info!(
            vehicle_number = %vehicle_number,
            from = old_spot_number,
            to = new_spot_number,
            "Vehicle relocated"
        );
        Ok(format!("{} parked to {}", vehicle_number, new_spot_number))
    }
}
