//! Parking spot model

use serde::{Deserialize, Serialize};

/// One numbered spot in the lot.
///
/// `is_available` is true exactly when both occupant fields are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingSpot {
    pub spot_number: i64,
    pub vehicle_number: Option<String>,
    pub vehicle_mark: Option<String>,
    pub is_available: bool,
}

impl ParkingSpot {
    /// A free spot with no occupant
    pub fn available(spot_number: i64) -> Self {
        Self {
            spot_number,
            vehicle_number: None,
            vehicle_mark: None,
            is_available: true,
        }
    }

    /// Assign an occupant and mark the spot as taken
    pub fn park(&mut self, vehicle: Vehicle) {
        self.vehicle_number = Some(vehicle.vehicle_number);
        self.vehicle_mark = Some(vehicle.vehicle_mark);
        self.is_available = false;
    }

    /// Clear the occupant and mark the spot as free
    pub fn clear(&mut self) {
        self.vehicle_number = None;
        self.vehicle_mark = None;
        self.is_available = true;
    }
}

/// Vehicle identity as submitted in request bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Occupant identifier (licence plate)
    pub vehicle_number: String,
    /// Occupant descriptor (make)
    pub vehicle_mark: String,
}

impl Vehicle {
    pub fn new(vehicle_number: impl Into<String>, vehicle_mark: impl Into<String>) -> Self {
        Self {
            vehicle_number: vehicle_number.into(),
            vehicle_mark: vehicle_mark.into(),
        }
    }
}
