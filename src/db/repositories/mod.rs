//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository owns the SQL for one table.

pub mod access_token;
pub mod parking_spot;

pub use access_token::{AccessTokenRepository, SqlxAccessTokenRepository};
pub use parking_spot::{ParkingSpotRepository, SqlxParkingSpotRepository};
