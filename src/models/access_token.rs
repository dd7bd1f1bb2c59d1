//! Access token model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored access token with its absolute expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Full credential as presented in the `Authorization` header
    pub token: String,
    /// Expiration timestamp, seconds resolution
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Expiry as unix seconds, the stored representation
    pub fn expires_at_unix(&self) -> i64 {
        self.expires_at.timestamp()
    }

    /// A token is still valid at exactly its expiry second.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.timestamp() < now.timestamp()
    }
}
