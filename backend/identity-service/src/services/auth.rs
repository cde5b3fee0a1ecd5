/// Identity facade consumed by transport layers
///
/// Wires the lifecycle, credential checks and token issuer together. Every
/// privileged operation takes the acting `Actor` explicitly.
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{AccountStore, RoleStore, SessionStore};
use crate::error::{IdentityError, Result};
use crate::models::{Account, LoginRequest, RegisterRequest};
use crate::security::password::{self, verify_password_or_dummy};
use crate::security::{normalize_national_id, validate_national_id, Actor, Claims, TokenIssuer, TokenPair};
use crate::services::AccountLifecycle;

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub tokens: TokenPair,
    pub account: Account,
}

pub struct AuthService {
    accounts: Arc<dyn AccountStore>,
    lifecycle: AccountLifecycle,
    tokens: Arc<TokenIssuer>,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        roles: Arc<dyn RoleStore>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        if !password::warm_up() {
            warn!("Dummy password hash unavailable; unknown-account logins skip hashing");
        }
        Self {
            lifecycle: AccountLifecycle::new(accounts.clone(), roles),
            accounts,
            tokens,
        }
    }

    /// Build the store-backed issuer and the service in one step
    pub fn from_stores(
        settings: &crate::config::JwtSettings,
        accounts: Arc<dyn AccountStore>,
        roles: Arc<dyn RoleStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let tokens = Arc::new(TokenIssuer::new(settings, accounts.clone(), sessions)?);
        Ok(Self::new(accounts, roles, tokens))
    }

    pub fn tokens(&self) -> Arc<TokenIssuer> {
        self.tokens.clone()
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<Account> {
        self.lifecycle.register(request).await
    }

    /// Credential check plus login gate. Every failure is the same
    /// `InvalidCredentials`, and a password hash is verified on every path.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        let national_id = normalize_national_id(&request.national_id);

        let account = if validate_national_id(&national_id) {
            self.accounts.find_by_national_id(&national_id).await?
        } else {
            None
        };

        let verified = verify_password_or_dummy(
            &request.password,
            account.as_ref().map(|a| a.password_hash.as_str()),
        );

        let account = match account {
            Some(account) if verified && account.can_login() => account,
            other => {
                warn!(
                    national_id_suffix = %id_suffix(&national_id),
                    known = other.is_some(),
                    "Login failed"
                );
                return Err(IdentityError::InvalidCredentials);
            }
        };

        let tokens = self.tokens.issue_pair(&account).await?;
        info!(account_id = %account.id, level = account.role_level, "Login succeeded");

        Ok(LoginResponse { tokens, account })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        self.tokens.refresh(refresh_token).await
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        self.tokens.logout(refresh_token).await
    }

    /// End every session of the acting account
    pub async fn logout_everywhere(&self, actor: &Actor) -> Result<u64> {
        self.tokens.revoke_all(actor.account_id).await
    }

    pub async fn authorize(&self, actor: &Actor, target_id: Uuid) -> Result<Account> {
        self.lifecycle.authorize(actor, target_id).await
    }

    pub async fn reject(
        &self,
        actor: &Actor,
        target_id: Uuid,
        reason: Option<String>,
    ) -> Result<Account> {
        self.lifecycle.reject(actor, target_id, reason).await
    }

    pub async fn list_pending(&self, actor: &Actor) -> Result<Vec<Account>> {
        self.lifecycle.list_pending(actor).await
    }

    pub async fn list_by_municipality(
        &self,
        actor: &Actor,
        municipality_id: i32,
    ) -> Result<Vec<Account>> {
        self.lifecycle
            .list_by_municipality(actor, municipality_id)
            .await
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims> {
        self.tokens.verify_access_token(token)
    }

    /// Verify an access token and turn it into the acting identity
    pub fn actor_from_token(&self, token: &str) -> Result<Actor> {
        Actor::from_claims(&self.verify_access_token(token)?)
    }
}

fn id_suffix(national_id: &str) -> &str {
    let start = national_id.len().saturating_sub(4);
    &national_id[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_suffix() {
        assert_eq!(id_suffix("52998224725"), "4725");
        assert_eq!(id_suffix("12"), "12");
        assert_eq!(id_suffix(""), "");
    }
}
