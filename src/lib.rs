//! Parkgate - parking lot occupancy service
//!
//! Issues short-lived access tokens and tracks which vehicle sits in which
//! spot of a fixed-size lot.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
