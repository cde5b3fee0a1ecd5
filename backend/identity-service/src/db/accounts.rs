/// Account database operations
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::AccountStore;
use crate::error::{IdentityError, Result};
use crate::models::{Account, AccountStatus, NewAccount, StatusChange};

/// Column list shared by every account read; `u` is users, `r` is roles
const ACCOUNT_COLUMNS: &str = r#"
    u.id, u.email, u.password_hash, u.name, u.national_id, u.phone,
    u.role_id, r.name AS role_name, r.level AS role_level,
    u.municipality_id, u.unit, u.status, u.is_authorized,
    u.created_at, u.updated_at
"#;

#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, filter: &str, value: impl AsRef<str>) -> Result<Option<Account>> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id WHERE {filter} = $1"
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(value.as_ref())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IdentityError::Database(e.to_string()))?;

        Ok(account)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = $1"
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IdentityError::Database(e.to_string()))?;

        Ok(account)
    }

    async fn find_by_national_id(&self, national_id: &str) -> Result<Option<Account>> {
        self.find_one("u.national_id", national_id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.find_one("u.email", email).await
    }

    async fn create(&self, account: &NewAccount) -> Result<Account> {
        let now = Utc::now();
        let sql = format!(
            r#"
            WITH u AS (
                INSERT INTO users (
                    id, email, password_hash, name, national_id, phone,
                    role_id, municipality_id, unit, status, is_authorized,
                    created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, $11, $11)
                RETURNING *
            )
            SELECT {ACCOUNT_COLUMNS} FROM u JOIN roles r ON r.id = u.role_id
            "#
        );

        let created = sqlx::query_as::<_, Account>(&sql)
            .bind(Uuid::new_v4())
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(&account.name)
            .bind(&account.national_id)
            .bind(&account.phone)
            .bind(account.role_id)
            .bind(account.municipality_id)
            .bind(&account.unit)
            .bind(AccountStatus::PendingAuthorization)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    IdentityError::Conflict
                } else {
                    IdentityError::Database(e.to_string())
                }
            })?;

        debug!(account_id = %created.id, "Account row inserted");
        Ok(created)
    }

    async fn update_status(&self, change: &StatusChange) -> Result<bool> {
        let now = Utc::now();
        let (status, is_authorized) = change.decision.outcome();

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET status = $1, is_authorized = $2, updated_at = $3
            WHERE id = $4 AND status = $5
            "#,
        )
        .bind(status)
        .bind(is_authorized)
        .bind(now)
        .bind(change.account_id)
        .bind(change.expected)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let record = change.record(now);
        sqlx::query(
            r#"
            INSERT INTO user_authorizations (id, user_id, decided_by, decision, reason, decided_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id)
        .bind(record.account_id)
        .bind(record.decided_by)
        .bind(record.decision)
        .bind(&record.reason)
        .bind(record.decided_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_by_status(&self, status: AccountStatus) -> Result<Vec<Account>> {
        let sql = format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM users u JOIN roles r ON r.id = u.role_id
            WHERE u.status = $1
            ORDER BY u.created_at ASC, u.id ASC
            "#
        );
        let accounts = sqlx::query_as::<_, Account>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IdentityError::Database(e.to_string()))?;

        Ok(accounts)
    }

    async fn list_active_by_municipality(&self, municipality_id: i32) -> Result<Vec<Account>> {
        let sql = format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM users u JOIN roles r ON r.id = u.role_id
            WHERE u.municipality_id = $1 AND u.status = $2
            ORDER BY u.created_at ASC, u.id ASC
            "#
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(municipality_id)
            .bind(AccountStatus::Active)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IdentityError::Database(e.to_string()))
    }
}
