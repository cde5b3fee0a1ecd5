/// In-process stores with the same contracts as the Postgres ones.
///
/// Each store keeps its state behind one lock, so compound operations
/// (`update_status`, `rotate`) are atomic the same way a transaction is.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{AccountStore, RoleStore, SessionStore};
use crate::error::{IdentityError, Result};
use crate::models::{
    Account, AccountStatus, AuthorizationRecord, NewAccount, NewSession, RefreshSession, Role,
    StatusChange,
};
use crate::security::rank::Tier;

/// Seed roles, same names and levels as the initial migration
const DEFAULT_ROLES: [(&str, &str, i32); 4] = [
    ("ADM", "Administrador do sistema", 1),
    ("Coordenador", "Coordenador municipal", 2),
    ("Gerente", "Gerente de unidade", 3),
    ("ACS", "Agente Comunitário de Saúde", 4),
];

#[derive(Default)]
pub struct InMemoryRoleStore {
    roles: RwLock<Vec<Role>>,
}

impl InMemoryRoleStore {
    pub fn new(roles: Vec<Role>) -> Self {
        Self {
            roles: RwLock::new(roles),
        }
    }

    pub fn with_default_roles() -> Self {
        let now = Utc::now();
        let roles = DEFAULT_ROLES
            .iter()
            .map(|(name, description, level)| Role {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: description.to_string(),
                level: *level,
                created_at: now,
                updated_at: now,
            })
            .collect();
        Self::new(roles)
    }

    pub async fn find_by_tier(&self, tier: Tier) -> Option<Role> {
        self.roles
            .read()
            .await
            .iter()
            .find(|r| r.level == tier.level())
            .cloned()
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>> {
        Ok(self.roles.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Role>> {
        let mut roles = self.roles.read().await.clone();
        roles.sort_by_key(|r| r.level);
        Ok(roles)
    }
}

#[derive(Default)]
struct AccountState {
    /// Insertion order
    accounts: Vec<Account>,
    records: Vec<AuthorizationRecord>,
}

pub struct InMemoryAccountStore {
    roles: Arc<InMemoryRoleStore>,
    state: RwLock<AccountState>,
}

impl InMemoryAccountStore {
    pub fn new(roles: Arc<InMemoryRoleStore>) -> Self {
        Self {
            roles,
            state: RwLock::new(AccountState::default()),
        }
    }

    /// Store a fully formed account, bypassing registration rules.
    /// Uniqueness still applies.
    pub async fn insert(&self, account: Account) -> Result<()> {
        let mut state = self.state.write().await;
        if state
            .accounts
            .iter()
            .any(|a| a.email == account.email || a.national_id == account.national_id)
        {
            return Err(IdentityError::Conflict);
        }
        state.accounts.push(account);
        Ok(())
    }

    /// Audit trail, oldest first
    pub async fn authorization_records(&self) -> Vec<AuthorizationRecord> {
        self.state.read().await.records.clone()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_national_id(&self, national_id: &str) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .iter()
            .find(|a| a.national_id == national_id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn create(&self, account: &NewAccount) -> Result<Account> {
        let role = self
            .roles
            .find_by_id(account.role_id)
            .await?
            .ok_or_else(|| IdentityError::NotFound(format!("role {}", account.role_id)))?;

        let now = Utc::now();
        let created = Account {
            id: Uuid::new_v4(),
            email: account.email.clone(),
            password_hash: account.password_hash.clone(),
            name: account.name.clone(),
            national_id: account.national_id.clone(),
            phone: account.phone.clone(),
            role_id: role.id,
            role_name: role.name,
            role_level: role.level,
            municipality_id: account.municipality_id,
            unit: account.unit.clone(),
            status: AccountStatus::PendingAuthorization,
            is_authorized: false,
            created_at: now,
            updated_at: now,
        };

        self.insert(created.clone()).await?;
        Ok(created)
    }

    async fn update_status(&self, change: &StatusChange) -> Result<bool> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        let Some(account) = state
            .accounts
            .iter_mut()
            .find(|a| a.id == change.account_id && a.status == change.expected)
        else {
            return Ok(false);
        };

        let (status, is_authorized) = change.decision.outcome();
        account.status = status;
        account.is_authorized = is_authorized;
        account.updated_at = now;

        state.records.push(change.record(now));
        Ok(true)
    }

    async fn list_by_status(&self, status: AccountStatus) -> Result<Vec<Account>> {
        let state = self.state.read().await;
        let mut accounts: Vec<Account> = state
            .accounts
            .iter()
            .filter(|a| a.status == status)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps
        accounts.sort_by_key(|a| a.created_at);
        Ok(accounts)
    }

    async fn list_active_by_municipality(&self, municipality_id: i32) -> Result<Vec<Account>> {
        let state = self.state.read().await;
        let mut accounts: Vec<Account> = state
            .accounts
            .iter()
            .filter(|a| {
                a.status == AccountStatus::Active && a.municipality_id == Some(municipality_id)
            })
            .cloned()
            .collect();
        accounts.sort_by_key(|a| a.created_at);
        Ok(accounts)
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<Vec<RefreshSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live sessions for an account at `now`
    pub async fn live_sessions(&self, account_id: Uuid, now: DateTime<Utc>) -> Vec<RefreshSession> {
        self.sessions
            .lock()
            .await
            .iter()
            .filter(|s| s.account_id == account_id && s.is_live(now))
            .cloned()
            .collect()
    }

    /// Every stored session, revoked and expired included
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn find_by_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshSession>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions
            .iter()
            .find(|s| s.token_hash == token_hash && s.is_live(now))
            .cloned())
    }

    async fn rotate(
        &self,
        account_id: Uuid,
        consumed: Option<&str>,
        new: &NewSession,
    ) -> Result<RefreshSession> {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();

        if let Some(consumed) = consumed {
            let still_live = sessions.iter().any(|s| {
                s.token_hash == consumed && s.account_id == account_id && s.is_live(now)
            });
            if !still_live {
                return Err(IdentityError::InvalidToken);
            }
        }

        for session in sessions
            .iter_mut()
            .filter(|s| s.account_id == account_id && !s.is_revoked)
        {
            session.is_revoked = true;
            session.revoked_at = Some(now);
        }

        let session = RefreshSession {
            id: Uuid::new_v4(),
            account_id: new.account_id,
            token_hash: new.token_hash.clone(),
            expires_at: new.expires_at,
            is_revoked: false,
            revoked_at: None,
            created_at: now,
        };
        sessions.push(session.clone());
        Ok(session)
    }

    async fn revoke_by_token(&self, token_hash: &str) -> Result<bool> {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();
        match sessions
            .iter_mut()
            .find(|s| s.token_hash == token_hash && !s.is_revoked)
        {
            Some(session) => {
                session.is_revoked = true;
                session.revoked_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_all_by_account(&self, account_id: Uuid) -> Result<u64> {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();
        let mut revoked = 0;
        for session in sessions
            .iter_mut()
            .filter(|s| s.account_id == account_id && !s.is_revoked)
        {
            session.is_revoked = true;
            session.revoked_at = Some(now);
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|s| {
            let revoked_before = s.revoked_at.map(|at| at < now).unwrap_or(false);
            s.expires_at >= now && !revoked_before
        });
        Ok((before - sessions.len()) as u64)
    }
}
