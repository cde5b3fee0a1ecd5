/// Persistence seams for identity-service
///
/// Services depend on these traits, never on a concrete pool. `Pg*` stores
/// back production; `memory` stores back tests and local tooling.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Account, AccountStatus, NewAccount, NewSession, RefreshSession, Role, StatusChange,
};

pub mod accounts;
pub mod memory;
pub mod roles;
pub mod sessions;

pub use accounts::PgAccountStore;
pub use memory::{InMemoryAccountStore, InMemoryRoleStore, InMemorySessionStore};
pub use roles::PgRoleStore;
pub use sessions::PgSessionStore;

/// Account persistence. Lookups return accounts joined with their role.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// `national_id` in canonical 11-digit form
    async fn find_by_national_id(&self, national_id: &str) -> Result<Option<Account>>;

    /// `email` already normalized
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Insert a pending, unauthorized account.
    ///
    /// # Errors
    ///
    /// `IdentityError::Conflict` when the email or national ID is taken,
    /// including when a concurrent insert wins the race.
    async fn create(&self, account: &NewAccount) -> Result<Account>;

    /// Compare-and-set on status, writing the audit record atomically with it.
    ///
    /// Returns `false` without writing anything when the account is no
    /// longer in `change.expected`.
    async fn update_status(&self, change: &StatusChange) -> Result<bool>;

    /// Oldest first
    async fn list_by_status(&self, status: AccountStatus) -> Result<Vec<Account>>;

    /// Active accounts assigned to a municipality, oldest first
    async fn list_active_by_municipality(&self, municipality_id: i32) -> Result<Vec<Account>>;
}

/// Role reference data
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>>;

    /// Ordered by level, highest authority first
    async fn list(&self) -> Result<Vec<Role>>;
}

/// Refresh-token sessions, keyed by token digest
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Live sessions only: not revoked, not expired at `now`
    async fn find_by_token(&self, token_hash: &str, now: DateTime<Utc>)
        -> Result<Option<RefreshSession>>;

    /// Atomically replace the account's sessions with `new`.
    ///
    /// When `consumed` is given it must still be live, otherwise the call
    /// fails with `IdentityError::InvalidToken` and nothing changes. Every
    /// other live session of the account is revoked, so at most one live
    /// session exists per account afterwards.
    async fn rotate(
        &self,
        account_id: Uuid,
        consumed: Option<&str>,
        new: &NewSession,
    ) -> Result<RefreshSession>;

    /// Returns whether a live session was revoked
    async fn revoke_by_token(&self, token_hash: &str) -> Result<bool>;

    /// Returns the number of sessions revoked
    async fn revoke_all_by_account(&self, account_id: Uuid) -> Result<u64>;

    /// Delete sessions that expired before `now` or were revoked before it
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}
