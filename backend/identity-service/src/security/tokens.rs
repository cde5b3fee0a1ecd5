/// Access and refresh token issuance
///
/// Access tokens are HS256 JWTs (via crypto-core) that are never persisted
/// and cannot be revoked before they expire. Refresh tokens are 32 random
/// bytes, hex-encoded, stored only as a SHA-256 digest. Each account holds
/// at most one live refresh session, and every refresh consumes the
/// presented token.
use chrono::{DateTime, Duration, Utc};
use crypto_core::jwt::JwtKeys;
use crypto_core::{generate_opaque_token, sha256_hex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::JwtSettings;
use crate::db::{AccountStore, SessionStore};
use crate::error::{IdentityError, Result};
use crate::models::{Account, NewSession};

/// Refresh token entropy in bytes (64 hex characters on the wire)
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Clock skew tolerated when checking `exp`
const LEEWAY_SECS: u64 = 5;

/// Access token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account ID
    pub sub: String,
    /// Canonical 11-digit national ID
    pub national_id: String,
    /// Role name
    pub role: String,
    /// Rank level, 1 = highest authority
    pub level: i32,
    pub is_authorized: bool,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

pub struct TokenIssuer {
    keys: JwtKeys,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    accounts: Arc<dyn AccountStore>,
    sessions: Arc<dyn SessionStore>,
}

impl TokenIssuer {
    /// ## Errors
    ///
    /// Fails when the secret is too short to sign with or a TTL does not fit
    /// a timestamp.
    pub fn new(
        settings: &JwtSettings,
        accounts: Arc<dyn AccountStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let keys = JwtKeys::from_secret(settings.secret.as_bytes())?
            .with_issuer(settings.issuer.clone())
            .with_leeway(LEEWAY_SECS);

        Ok(Self {
            keys,
            issuer: settings.issuer.clone(),
            access_ttl: to_chrono(settings.access_ttl)?,
            refresh_ttl: to_chrono(settings.refresh_ttl)?,
            accounts,
            sessions,
        })
    }

    /// Override both lifetimes. Negative values mint already-expired tokens.
    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Sign an access token for `account`. No store access.
    pub fn issue_access_token(&self, account: &Account) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: account.id.to_string(),
            national_id: account.national_id.clone(),
            role: account.role_name.clone(),
            level: account.role_level,
            is_authorized: account.is_authorized,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expiry(now, self.access_ttl)?.timestamp(),
        };

        Ok(self.keys.encode(&claims)?)
    }

    /// Start a fresh refresh session, revoking every other session of the account
    pub async fn issue_refresh_token(&self, account_id: Uuid) -> Result<String> {
        let (token, session) = self.mint_refresh(account_id)?;
        self.sessions.rotate(account_id, None, &session).await?;

        debug!(account_id = %account_id, "Refresh session issued");
        Ok(token)
    }

    /// Access token plus a new refresh session
    pub async fn issue_pair(&self, account: &Account) -> Result<TokenPair> {
        let access_token = self.issue_access_token(account)?;
        let refresh_token = self.issue_refresh_token(account.id).await?;
        Ok(self.pair(access_token, refresh_token))
    }

    /// Exchange a live refresh token for a new pair. The presented token is
    /// consumed: a second use fails with `InvalidToken`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let token_hash = sha256_hex(refresh_token);

        let session = self
            .sessions
            .find_by_token(&token_hash, Utc::now())
            .await?
            .ok_or(IdentityError::InvalidToken)?;

        let account = self
            .accounts
            .find_by_id(session.account_id)
            .await?
            .ok_or(IdentityError::InvalidToken)?;

        if !account.can_login() {
            return Err(IdentityError::AccountState(format!(
                "account is {}",
                account.status
            )));
        }

        let (new_token, new_session) = self.mint_refresh(account.id)?;
        self.sessions
            .rotate(account.id, Some(&token_hash), &new_session)
            .await?;

        let access_token = self.issue_access_token(&account)?;

        info!(account_id = %account.id, "Refresh token rotated");
        Ok(self.pair(access_token, new_token))
    }

    /// Revoke a refresh token. Unknown or already revoked tokens are not an error.
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        let revoked = self
            .sessions
            .revoke_by_token(&sha256_hex(refresh_token))
            .await?;

        debug!(revoked, "Logout processed");
        Ok(())
    }

    /// Revoke every session of an account
    pub async fn revoke_all(&self, account_id: Uuid) -> Result<u64> {
        let revoked = self.sessions.revoke_all_by_account(account_id).await?;
        info!(account_id = %account_id, revoked, "All refresh sessions revoked");
        Ok(revoked)
    }

    /// Delete sessions that can never be used again
    pub async fn purge_expired_sessions(&self) -> Result<u64> {
        self.sessions.purge_expired(Utc::now()).await
    }

    /// Check signature, issuer and expiry of an access token
    pub fn verify_access_token(&self, token: &str) -> Result<Claims> {
        Ok(self.keys.decode::<Claims>(token)?.claims)
    }

    fn mint_refresh(&self, account_id: Uuid) -> Result<(String, NewSession)> {
        let expires_at = expiry(Utc::now(), self.refresh_ttl)?;
        let token = generate_opaque_token(REFRESH_TOKEN_BYTES);
        let session = NewSession {
            account_id,
            token_hash: sha256_hex(&token),
            expires_at,
        };
        Ok((token, session))
    }

    fn pair(&self, access_token: String, refresh_token: String) -> TokenPair {
        TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        }
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| IdentityError::Internal("token expiry out of range".into()))
}

fn to_chrono(ttl: std::time::Duration) -> Result<Duration> {
    Duration::from_std(ttl)
        .map_err(|e| IdentityError::Internal(format!("TTL out of range: {e}")))
}
