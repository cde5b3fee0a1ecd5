use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted refresh-token session. Only the SHA-256 digest of the token is stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshSession {
    pub id: Uuid,
    pub account_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshSession {
    /// Not revoked and not yet expired
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && self.expires_at > now
    }
}

/// Session to be inserted by `SessionStore::rotate`
#[derive(Debug, Clone)]
pub struct NewSession {
    pub account_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}
