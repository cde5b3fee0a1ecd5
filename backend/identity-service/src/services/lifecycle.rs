/// Account lifecycle: registration and hierarchical approval
///
/// `pending_authorization` is the only state this service moves accounts
/// out of. Approval and rejection are decided by an explicit `Actor` and
/// checked against the rank table before anything is written.
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::{AccountStore, RoleStore};
use crate::error::{IdentityError, Result};
use crate::models::{
    Account, AccountStatus, AuthorizationDecision, NewAccount, RegisterRequest, StatusChange,
};
use crate::security::{hash_password, Actor, NationalId};
use crate::validators::normalize_email;

pub struct AccountLifecycle {
    accounts: Arc<dyn AccountStore>,
    roles: Arc<dyn RoleStore>,
}

impl AccountLifecycle {
    pub fn new(accounts: Arc<dyn AccountStore>, roles: Arc<dyn RoleStore>) -> Self {
        Self { accounts, roles }
    }

    /// Public self-registration. The new account is pending and unauthorized.
    ///
    /// ## Errors
    ///
    /// - `Policy` when the requested role is the top tier, checked before
    ///   any other field
    /// - `Validation` for an unknown role, bad national ID, or malformed fields
    /// - `Conflict` when the email or national ID is already bound
    pub async fn register(&self, request: RegisterRequest) -> Result<Account> {
        let role = self
            .roles
            .find_by_id(request.role_id)
            .await?
            .ok_or_else(|| IdentityError::Validation("unknown role".to_string()))?;

        let tier = role.tier().ok_or_else(|| {
            IdentityError::Validation(format!("role {} has no rank tier", role.name))
        })?;

        if !tier.may_self_register() {
            warn!(role = %role.name, "Rejected self-registration into top tier");
            return Err(IdentityError::Policy(format!(
                "role {} cannot be self-registered",
                role.name
            )));
        }

        request.validate()?;
        let national_id = NationalId::parse(&request.national_id)?;
        let email = normalize_email(&request.email);

        if self.accounts.find_by_email(&email).await?.is_some()
            || self
                .accounts
                .find_by_national_id(national_id.as_str())
                .await?
                .is_some()
        {
            return Err(IdentityError::Conflict);
        }

        let password_hash = hash_password(&request.password)?;

        let account = self
            .accounts
            .create(&NewAccount {
                email,
                password_hash,
                name: request.name.trim().to_string(),
                national_id: national_id.as_str().to_string(),
                phone: request.phone.filter(|p| !p.trim().is_empty()),
                role_id: role.id,
                municipality_id: request.municipality_id,
                unit: request.unit,
            })
            .await?;

        info!(
            account_id = %account.id,
            role = %account.role_name,
            level = account.role_level,
            national_id = %national_id.masked(),
            "Account registered, awaiting authorization"
        );

        Ok(account)
    }

    /// Approve a pending registration: `active`, `is_authorized = true`
    pub async fn authorize(&self, actor: &Actor, target_id: Uuid) -> Result<Account> {
        self.decide(actor, target_id, AuthorizationDecision::Approved, None)
            .await
    }

    /// Reject a pending registration: `inactive`, `is_authorized` stays false
    pub async fn reject(
        &self,
        actor: &Actor,
        target_id: Uuid,
        reason: Option<String>,
    ) -> Result<Account> {
        self.decide(actor, target_id, AuthorizationDecision::Rejected, reason)
            .await
    }

    /// Pending accounts this actor may decide on, oldest first
    pub async fn list_pending(&self, actor: &Actor) -> Result<Vec<Account>> {
        if !actor.tier.has_authorizing_power() {
            return Ok(Vec::new());
        }

        let pending = self
            .accounts
            .list_by_status(AccountStatus::PendingAuthorization)
            .await?;

        Ok(pending
            .into_iter()
            .filter(|account| {
                account
                    .tier()
                    .map(|tier| actor.can_authorize(tier))
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Active accounts of one municipality, oldest first. Only tiers that can
    /// authorize someone may browse the roster.
    pub async fn list_by_municipality(
        &self,
        actor: &Actor,
        municipality_id: i32,
    ) -> Result<Vec<Account>> {
        if !actor.tier.has_authorizing_power() {
            return Err(IdentityError::Forbidden(format!(
                "rank level {} cannot list accounts",
                actor.tier.level()
            )));
        }

        self.accounts
            .list_active_by_municipality(municipality_id)
            .await
    }

    async fn decide(
        &self,
        actor: &Actor,
        target_id: Uuid,
        decision: AuthorizationDecision,
        reason: Option<String>,
    ) -> Result<Account> {
        let mut target = self
            .accounts
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| IdentityError::NotFound(format!("account {target_id}")))?;

        if !target.is_pending() {
            return Err(IdentityError::InvalidState(format!(
                "account is {}, expected {}",
                target.status,
                AccountStatus::PendingAuthorization
            )));
        }

        let permitted = target
            .tier()
            .map(|tier| actor.can_authorize(tier))
            .unwrap_or(false);
        if !permitted {
            warn!(
                actor_id = %actor.account_id,
                actor_level = actor.tier.level(),
                target_id = %target.id,
                target_level = target.role_level,
                "Authorization denied by rank"
            );
            return Err(IdentityError::Forbidden(format!(
                "rank level {} cannot decide on rank level {}",
                actor.tier.level(),
                target.role_level
            )));
        }

        let change = StatusChange {
            account_id: target.id,
            expected: AccountStatus::PendingAuthorization,
            decided_by: actor.account_id,
            decision,
            reason: reason.filter(|r| !r.trim().is_empty()),
        };

        if !self.accounts.update_status(&change).await? {
            return Err(IdentityError::InvalidState(
                "account was decided concurrently".to_string(),
            ));
        }

        let (status, is_authorized) = decision.outcome();
        target.status = status;
        target.is_authorized = is_authorized;

        info!(
            actor_id = %actor.account_id,
            actor_level = actor.tier.level(),
            target_id = %target.id,
            target_level = target.role_level,
            decision = ?decision,
            "Registration decided"
        );

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MockAccountStore, MockRoleStore};
    use crate::models::Role;
    use crate::security::Tier;
    use chrono::Utc;

    fn role(level: i32) -> Role {
        let now = Utc::now();
        Role {
            id: Uuid::new_v4(),
            name: format!("level-{level}"),
            description: String::new(),
            level,
            created_at: now,
            updated_at: now,
        }
    }

    fn account(level: i32, status: AccountStatus) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            email: "acs@example.com".to_string(),
            password_hash: "hash".to_string(),
            name: "Agente".to_string(),
            national_id: "52998224725".to_string(),
            phone: None,
            role_id: Uuid::new_v4(),
            role_name: format!("level-{level}"),
            role_level: level,
            municipality_id: None,
            unit: None,
            status,
            is_authorized: status == AccountStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn request(role_id: Uuid) -> RegisterRequest {
        RegisterRequest {
            email: "Agente@Example.com ".to_string(),
            password: "senha123".to_string(),
            name: "Agente".to_string(),
            national_id: "529.982.247-25".to_string(),
            phone: None,
            role_id,
            municipality_id: Some(5002704),
            unit: None,
        }
    }

    fn lifecycle(accounts: MockAccountStore, roles: MockRoleStore) -> AccountLifecycle {
        AccountLifecycle::new(Arc::new(accounts), Arc::new(roles))
    }

    #[tokio::test]
    async fn test_top_tier_registration_is_policy_error_even_with_bad_fields() {
        let top = role(1);
        let mut roles = MockRoleStore::new();
        let returned = top.clone();
        roles
            .expect_find_by_id()
            .returning(move |_| Ok(Some(returned.clone())));
        let mut accounts = MockAccountStore::new();
        accounts.expect_create().never();

        let mut bad = request(top.id);
        bad.national_id = "11111111111".to_string();
        bad.email = "not-an-email".to_string();

        let result = lifecycle(accounts, roles).register(bad).await;
        assert!(matches!(result, Err(IdentityError::Policy(_))));
    }

    #[tokio::test]
    async fn test_invalid_national_id_is_validation_error() {
        let agent = role(4);
        let mut roles = MockRoleStore::new();
        let returned = agent.clone();
        roles
            .expect_find_by_id()
            .returning(move |_| Ok(Some(returned.clone())));
        let mut accounts = MockAccountStore::new();
        accounts.expect_create().never();

        let mut bad = request(agent.id);
        bad.national_id = "529.982.247-26".to_string();

        let result = lifecycle(accounts, roles).register(bad).await;
        assert!(matches!(result, Err(IdentityError::Validation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let agent = role(4);
        let mut roles = MockRoleStore::new();
        let returned = agent.clone();
        roles
            .expect_find_by_id()
            .returning(move |_| Ok(Some(returned.clone())));
        let mut accounts = MockAccountStore::new();
        accounts
            .expect_find_by_email()
            .withf(|email| email == "agente@example.com")
            .returning(|_| Ok(Some(account(4, AccountStatus::Active))));
        accounts.expect_create().never();

        let result = lifecycle(accounts, roles).register(request(agent.id)).await;
        assert!(matches!(result, Err(IdentityError::Conflict)));
    }

    #[tokio::test]
    async fn test_forbidden_authorization_never_writes() {
        let target = account(3, AccountStatus::PendingAuthorization);
        let target_id = target.id;
        let mut accounts = MockAccountStore::new();
        accounts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(target.clone())));
        accounts.expect_update_status().never();

        let actor = Actor::new(Uuid::new_v4(), Tier::Manager);
        let result = lifecycle(accounts, MockRoleStore::new())
            .authorize(&actor, target_id)
            .await;
        assert!(matches!(result, Err(IdentityError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_authorize_active_account_is_state_error() {
        let target = account(4, AccountStatus::Active);
        let target_id = target.id;
        let mut accounts = MockAccountStore::new();
        accounts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(target.clone())));
        accounts.expect_update_status().never();

        let actor = Actor::new(Uuid::new_v4(), Tier::Coordinator);
        let result = lifecycle(accounts, MockRoleStore::new())
            .authorize(&actor, target_id)
            .await;
        assert!(matches!(result, Err(IdentityError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_missing_target_is_not_found() {
        let mut accounts = MockAccountStore::new();
        accounts.expect_find_by_id().returning(|_| Ok(None));

        let actor = Actor::new(Uuid::new_v4(), Tier::Administrator);
        let result = lifecycle(accounts, MockRoleStore::new())
            .reject(&actor, Uuid::new_v4(), None)
            .await;
        assert!(matches!(result, Err(IdentityError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_lost_race_is_state_error() {
        let target = account(4, AccountStatus::PendingAuthorization);
        let target_id = target.id;
        let mut accounts = MockAccountStore::new();
        accounts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(target.clone())));
        accounts
            .expect_update_status()
            .times(1)
            .returning(|_| Ok(false));

        let actor = Actor::new(Uuid::new_v4(), Tier::Coordinator);
        let result = lifecycle(accounts, MockRoleStore::new())
            .authorize(&actor, target_id)
            .await;
        assert!(matches!(result, Err(IdentityError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_reject_records_actor_and_reason() {
        let target = account(4, AccountStatus::PendingAuthorization);
        let target_id = target.id;
        let actor = Actor::new(Uuid::new_v4(), Tier::Manager);
        let actor_id = actor.account_id;

        let mut accounts = MockAccountStore::new();
        accounts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(target.clone())));
        accounts
            .expect_update_status()
            .withf(move |change| {
                change.account_id == target_id
                    && change.decided_by == actor_id
                    && change.expected == AccountStatus::PendingAuthorization
                    && change.decision == AuthorizationDecision::Rejected
                    && change.reason.as_deref() == Some("duplicate registration")
            })
            .times(1)
            .returning(|_| Ok(true));

        let rejected = lifecycle(accounts, MockRoleStore::new())
            .reject(&actor, target_id, Some("duplicate registration".to_string()))
            .await
            .unwrap();
        assert_eq!(rejected.status, AccountStatus::Inactive);
        assert!(!rejected.is_authorized);
    }

    #[tokio::test]
    async fn test_list_by_municipality_requires_authorizing_tier() {
        let mut accounts = MockAccountStore::new();
        accounts
            .expect_list_active_by_municipality()
            .withf(|municipality_id| *municipality_id == 5002704)
            .times(1)
            .returning(|_| Ok(vec![account(4, AccountStatus::Active)]));
        let service = lifecycle(accounts, MockRoleStore::new());

        let agent = Actor::new(Uuid::new_v4(), Tier::CommunityAgent);
        assert!(matches!(
            service.list_by_municipality(&agent, 5002704).await,
            Err(IdentityError::Forbidden(_))
        ));

        let manager = Actor::new(Uuid::new_v4(), Tier::Manager);
        let listed = service.list_by_municipality(&manager, 5002704).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn test_list_pending_filters_by_rank() {
        let mut accounts = MockAccountStore::new();
        accounts
            .expect_list_by_status()
            .returning(|_| {
                Ok(vec![
                    account(2, AccountStatus::PendingAuthorization),
                    account(3, AccountStatus::PendingAuthorization),
                    account(4, AccountStatus::PendingAuthorization),
                ])
            });
        let service = lifecycle(accounts, MockRoleStore::new());

        let coordinator = Actor::new(Uuid::new_v4(), Tier::Coordinator);
        let levels: Vec<i32> = service
            .list_pending(&coordinator)
            .await
            .unwrap()
            .iter()
            .map(|a| a.role_level)
            .collect();
        assert_eq!(levels, vec![3, 4]);

        let agent = Actor::new(Uuid::new_v4(), Tier::CommunityAgent);
        assert!(service.list_pending(&agent).await.unwrap().is_empty());
    }
}
