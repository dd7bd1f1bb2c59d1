//! Data models
//!
//! Models represent:
//! - Database entities (AccessToken, ParkingSpot)
//! - API request types (Vehicle)

mod access_token;
mod parking_spot;

pub use access_token::AccessToken;
pub use parking_spot::{ParkingSpot, Vehicle};
