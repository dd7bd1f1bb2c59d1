//! Database connection pool
//!
//! `DynDatabasePool` is the storage handle passed into every repository.
//! The backend is picked from `DatabaseConfig::driver`; callers branch on
//! `driver()` and borrow the matching sqlx pool through `sqlite()` or
//! `mysql()`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::path::Path;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

const SQLITE_MAX_CONNECTIONS: u32 = 20;
const MYSQL_MAX_CONNECTIONS: u32 = 30;

/// Storage handle shared by repositories
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Run a statement that returns no rows, yielding rows affected
    async fn execute(&self, query: &str) -> Result<u64>;

    /// Round-trip a trivial query
    async fn ping(&self) -> Result<()>;

    fn driver(&self) -> DatabaseDriver;

    /// The SQLite pool, or an error on a MySQL handle
    fn sqlite(&self) -> Result<&SqlitePool>;

    /// The MySQL pool, or an error on a SQLite handle
    fn mysql(&self) -> Result<&MySqlPool>;
}

/// Type alias for a shared database pool
pub type DynDatabasePool = Arc<dyn DatabasePool>;

struct SqliteDatabase(SqlitePool);

struct MysqlDatabase(MySqlPool);

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let done = sqlx::query(query)
            .execute(&self.0)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(done.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.0)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn sqlite(&self) -> Result<&SqlitePool> {
        Ok(&self.0)
    }

    fn mysql(&self) -> Result<&MySqlPool> {
        bail!("Database pool is SQLite, not MySQL")
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let done = sqlx::query(query)
            .execute(&self.0)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(done.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.0)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn sqlite(&self) -> Result<&SqlitePool> {
        bail!("Database pool is MySQL, not SQLite")
    }

    fn mysql(&self) -> Result<&MySqlPool> {
        Ok(&self.0)
    }
}

/// Connect to the database named by the configuration.
///
/// For a file-backed SQLite database the parent directory is created first.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    match config.driver {
        DatabaseDriver::Sqlite => {
            let url = sqlite_url(&config.url);
            if let Some(path) = sqlite_file_path(&url) {
                ensure_parent_dir(Path::new(path))?;
            }
            let pool = SqlitePoolOptions::new()
                .max_connections(SQLITE_MAX_CONNECTIONS)
                .connect(&url)
                .await
                .with_context(|| format!("Failed to connect to SQLite database: {}", config.url))?;
            Ok(Arc::new(SqliteDatabase(pool)))
        }
        DatabaseDriver::Mysql => {
            let pool = MySqlPoolOptions::new()
                .max_connections(MYSQL_MAX_CONNECTIONS)
                .connect(&mysql_url(&config.url))
                .await
                .with_context(|| format!("Failed to connect to MySQL database: {}", config.url))?;
            Ok(Arc::new(MysqlDatabase(pool)))
        }
    }
}

/// In-memory SQLite pool for tests
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    create_pool(&DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    })
    .await
}

/// Normalize a configured SQLite location into an sqlx URL.
///
/// Plain paths get `mode=rwc` so the file is created on first start.
fn sqlite_url(configured: &str) -> String {
    match configured {
        ":memory:" | "sqlite::memory:" => "sqlite::memory:".to_string(),
        url if url.starts_with("sqlite:") && url.contains('?') => url.to_string(),
        url if url.starts_with("sqlite:") => format!("{}?mode=rwc", url),
        path => format!("sqlite:{}?mode=rwc", path),
    }
}

/// File path inside an sqlx SQLite URL, `None` for in-memory databases
fn sqlite_file_path(url: &str) -> Option<&str> {
    if url.starts_with("sqlite::memory:") {
        return None;
    }
    let rest = url.strip_prefix("sqlite:")?;
    let path = rest.split('?').next().unwrap_or(rest);
    let path = path.strip_prefix("//").unwrap_or(path);
    (!path.is_empty()).then_some(path)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory: {:?}", parent)),
        _ => Ok(()),
    }
}

fn mysql_url(configured: &str) -> String {
    if configured.starts_with("mysql://") {
        configured.to_string()
    } else {
        format!("mysql://{}", configured)
    }
}
