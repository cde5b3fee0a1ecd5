use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::account::AccountStatus;

/// Outcome of a registration review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "authorization_decision", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationDecision {
    Approved,
    Rejected,
}

impl AuthorizationDecision {
    /// Status and authorization flag the target ends up with
    pub fn outcome(self) -> (AccountStatus, bool) {
        match self {
            AuthorizationDecision::Approved => (AccountStatus::Active, true),
            AuthorizationDecision::Rejected => (AccountStatus::Inactive, false),
        }
    }
}

/// Audit trail entry written together with the status change
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuthorizationRecord {
    pub id: Uuid,
    pub account_id: Uuid,
    pub decided_by: Uuid,
    pub decision: AuthorizationDecision,
    pub reason: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// Compare-and-set status update applied by `AccountStore::update_status`
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub account_id: Uuid,
    /// Update only applies while the account is still in this state
    pub expected: AccountStatus,
    pub decided_by: Uuid,
    pub decision: AuthorizationDecision,
    pub reason: Option<String>,
}

impl StatusChange {
    pub fn record(&self, decided_at: DateTime<Utc>) -> AuthorizationRecord {
        AuthorizationRecord {
            id: Uuid::new_v4(),
            account_id: self.account_id,
            decided_by: self.decided_by,
            decision: self.decision,
            reason: self.reason.clone(),
            decided_at,
        }
    }
}
