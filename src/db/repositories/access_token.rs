//! Access token repository
//!
//! This module provides:
//! - `AccessTokenRepository` trait defining the interface for token storage
//! - `SqlxAccessTokenRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::AccessToken;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Access token repository trait
#[async_trait]
pub trait AccessTokenRepository: Send + Sync {
    /// Insert the token, or overwrite the expiry of an existing one
    async fn upsert(&self, token: &AccessToken) -> Result<AccessToken>;

    /// Get a token by its exact credential string
    async fn get_by_token(&self, token: &str) -> Result<Option<AccessToken>>;
}

/// SQLx-based access token repository implementation
pub struct SqlxAccessTokenRepository {
    pool: DynDatabasePool,
}

impl SqlxAccessTokenRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AccessTokenRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AccessTokenRepository for SqlxAccessTokenRepository {
    async fn upsert(&self, token: &AccessToken) -> Result<AccessToken> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => upsert_token_sqlite(self.pool.sqlite()?, token).await,
            DatabaseDriver::Mysql => upsert_token_mysql(self.pool.mysql()?, token).await,
        }
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<AccessToken>> {
        let query = "SELECT token, expires_at FROM access_tokens WHERE token = ?";
        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(query)
                .bind(token)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get access token")?
                .map(|row| (row.get::<String, _>("token"), row.get::<i64, _>("expires_at"))),
            DatabaseDriver::Mysql => sqlx::query(query)
                .bind(token)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get access token")?
                .map(|row| (row.get::<String, _>("token"), row.get::<i64, _>("expires_at"))),
        };

        row.map(|(token, expires_at)| to_access_token(token, expires_at))
            .transpose()
    }
}

async fn upsert_token_sqlite(pool: &SqlitePool, token: &AccessToken) -> Result<AccessToken> {
    sqlx::query(
        r#"
        INSERT INTO access_tokens (token, expires_at)
        VALUES (?, ?)
        ON CONFLICT(token) DO UPDATE SET expires_at = excluded.expires_at
        "#,
    )
    .bind(&token.token)
    .bind(token.expires_at_unix())
    .execute(pool)
    .await
    .context("Failed to store access token")?;

    Ok(token.clone())
}

async fn upsert_token_mysql(pool: &MySqlPool, token: &AccessToken) -> Result<AccessToken> {
    sqlx::query(
        r#"
        INSERT INTO access_tokens (token, expires_at)
        VALUES (?, ?)
        ON DUPLICATE KEY UPDATE expires_at = VALUES(expires_at)
        "#,
    )
    .bind(&token.token)
    .bind(token.expires_at_unix())
    .execute(pool)
    .await
    .context("Failed to store access token")?;

    Ok(token.clone())
}

fn to_access_token(token: String, expires_at: i64) -> Result<AccessToken> {
    let expires_at = DateTime::<Utc>::from_timestamp(expires_at, 0)
        .with_context(|| format!("Stored expiry out of range: {}", expires_at))?;
    Ok(AccessToken { token, expires_at })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup_test_repo() -> SqlxAccessTokenRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxAccessTokenRepository::new(pool)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let repo = setup_test_repo().await;
        let token = AccessToken::new("Basic dGVzdF8xOnRlc3QtbWFyaw==", at(1_700_000_900));

        repo.upsert(&token).await.expect("Failed to store token");

        let found = repo
            .get_by_token(&token.token)
            .await
            .expect("Failed to get token")
            .expect("Token not found");
        assert_eq!(found, token);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_expiry() {
        let repo = setup_test_repo().await;
        let first = AccessToken::new("Basic abc", at(1_700_000_000));
        let refreshed = AccessToken::new("Basic abc", first.expires_at + Duration::minutes(15));

        repo.upsert(&first).await.unwrap();
        repo.upsert(&refreshed).await.unwrap();

        let found = repo.get_by_token("Basic abc").await.unwrap().unwrap();
        assert_eq!(found.expires_at, refreshed.expires_at);
    }

    #[tokio::test]
    async fn test_get_requires_exact_match() {
        let repo = setup_test_repo().await;
        repo.upsert(&AccessToken::new("Basic abc", at(1_700_000_000)))
            .await
            .unwrap();

        assert!(repo.get_by_token("abc").await.unwrap().is_none());
        assert!(repo.get_by_token("basic abc").await.unwrap().is_none());
        assert!(repo.get_by_token("Basic abc ").await.unwrap().is_none());
    }
}
