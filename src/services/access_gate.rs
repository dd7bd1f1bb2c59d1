//! Access gate
//!
//! Issues bearer tokens for a vehicle and checks presented credentials
//! before any lot operation runs.
//!
//! Tokens are not secret: the value handed to the client is the base64 of
//! `"<vehicle_number>:<vehicle_mark>"`, so the same pair always yields the
//! same token and re-issuing it only refreshes the expiry. The stored key
//! carries the `Basic ` scheme prefix and must match the `Authorization`
//! header byte for byte.

use crate::db::repositories::AccessTokenRepository;
use crate::models::AccessToken;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use data_encoding::BASE64;
use serde::Serialize;
use std::sync::Arc;

/// Default token lifetime in minutes
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 15;

/// Longest accepted token lifetime, one hundred years
pub const MAX_TOKEN_TTL_MINUTES: i64 = 525_600 * 100;

/// Scheme prefix stored in front of every issued token
pub const TOKEN_SCHEME: &str = "Basic ";

/// Error types for authorization
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header was sent
    #[error("You are not authorized")]
    MissingCredential,

    /// Credential does not match any issued token
    #[error("You are not authorized")]
    UnknownToken,

    #[error("You are not authorized, token expired")]
    Expired,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Token handed back to the client on issuance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    /// Value to send as `Authorization: Basic <access_token>`
    pub access_token: String,
    /// Unix seconds
    pub expires_at: i64,
}

/// Access gate service
pub struct AccessGate {
    repo: Arc<dyn AccessTokenRepository>,
    token_ttl: Duration,
}

impl AccessGate {
    /// Create an access gate with the default 15 minute token lifetime
    pub fn new(repo: Arc<dyn AccessTokenRepository>) -> Self {
        Self {
            repo,
            token_ttl: Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
        }
    }

    /// Create an access gate with a custom token lifetime.
    ///
    /// The lifetime is clamped to `1..=MAX_TOKEN_TTL_MINUTES`.
    pub fn with_token_ttl(repo: Arc<dyn AccessTokenRepository>, ttl_minutes: i64) -> Self {
        let minutes = ttl_minutes.clamp(1, MAX_TOKEN_TTL_MINUTES);
        Self {
            repo,
            token_ttl: Duration::try_minutes(minutes)
                .unwrap_or_else(|| Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES)),
        }
    }

    /// Issue (or refresh) the token for a vehicle.
    pub async fn issue_token(
        &self,
        vehicle_number: &str,
        vehicle_mark: &str,
    ) -> Result<IssuedToken, AuthError> {
        self.issue_token_at(vehicle_number, vehicle_mark, Utc::now())
            .await
    }

    pub(crate) async fn issue_token_at(
        &self,
        vehicle_number: &str,
        vehicle_mark: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let access_token = derive_token(vehicle_number, vehicle_mark);
        let expires_at = now
            .checked_add_signed(self.token_ttl)
            .map(truncate_to_seconds)
            .context("Token expiry out of range")?;

        self.repo
            .upsert(&AccessToken::new(
                format!("{}{}", TOKEN_SCHEME, access_token),
                expires_at,
            ))
            .await?;

        tracing::debug!(
            vehicle_number,
            expires_at = expires_at.timestamp(),
            "Issued access token"
        );

        Ok(IssuedToken {
            access_token,
            expires_at: expires_at.timestamp(),
        })
    }

    /// Check a raw `Authorization` header value.
    ///
    /// # Errors
    ///
    /// - `MissingCredential` if no header was presented
    /// - `UnknownToken` if nothing was issued under that exact value
    /// - `Expired` if the stored expiry is before the current second
    pub async fn authorize(&self, credential: Option<&str>) -> Result<(), AuthError> {
        self.authorize_at(credential, Utc::now()).await
    }

    pub(crate) async fn authorize_at(
        &self,
        credential: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let credential = credential.ok_or(AuthError::MissingCredential)?;

        let token = match self.repo.get_by_token(credential).await? {
            Some(token) => token,
            None => {
                tracing::debug!("Rejected unknown access token");
                return Err(AuthError::UnknownToken);
            }
        };

        if token.is_expired_at(now) {
            tracing::debug!(
                expired_at = token.expires_at_unix(),
                "Rejected expired access token"
            );
            return Err(AuthError::Expired);
        }

        Ok(())
    }
}

/// Derive the client-facing token for a vehicle
pub fn derive_token(vehicle_number: &str, vehicle_mark: &str) -> String {
    BASE64.encode(format!("{}:{}", vehicle_number, vehicle_mark).as_bytes())
}

fn truncate_to_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}
