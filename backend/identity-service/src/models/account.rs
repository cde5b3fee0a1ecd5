use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;
use validator::Validate;

use crate::security::rank::Tier;

/// Account lifecycle status matching database account_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "account_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    PendingAuthorization,
    Active,
    Blocked,
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::PendingAuthorization => "pending_authorization",
            AccountStatus::Active => "active",
            AccountStatus::Blocked => "blocked",
            AccountStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account model joined with its role's name and level
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    /// Canonical 11-digit form
    pub national_id: String,
    pub phone: Option<String>,
    pub role_id: Uuid,
    pub role_name: String,
    pub role_level: i32,
    pub municipality_id: Option<i32>,
    pub unit: Option<String>,
    pub status: AccountStatus,
    pub is_authorized: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn tier(&self) -> Option<Tier> {
        Tier::from_level(self.role_level)
    }

    pub fn is_pending(&self) -> bool {
        self.status == AccountStatus::PendingAuthorization
    }

    /// Login gate: approved and active
    pub fn can_login(&self) -> bool {
        self.status == AccountStatus::Active && self.is_authorized
    }
}

/// Insert payload. Accounts always start pending and unauthorized.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub national_id: String,
    pub phone: Option<String>,
    pub role_id: Uuid,
    pub municipality_id: Option<i32>,
    pub unit: Option<String>,
}

/// Public registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "crate::validators::validate_email_shape_validator"))]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Formatted or bare; checksum validated separately
    pub national_id: String,
    #[validate(custom(function = "crate::validators::validate_phone_shape_validator"))]
    pub phone: Option<String>,
    pub role_id: Uuid,
    pub municipality_id: Option<i32>,
    #[validate(length(max = 255))]
    pub unit: Option<String>,
}

/// Login by national ID and password
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub national_id: String,
    pub password: String,
}
