//! Database layer
//!
//! Storage for issued access tokens and parking spots. Supported backends:
//! - SQLite (default, single file or in-memory)
//! - MySQL
//!
//! The driver is picked from configuration and hidden behind the
//! `DatabasePool` trait, so repositories and services never name a backend
//! directly.
//!
//! # Usage
//!
//! ```ignore
//! use parkgate::config::DatabaseConfig;
//! use parkgate::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool};
