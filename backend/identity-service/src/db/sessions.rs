/// Refresh-token session database operations
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::SessionStore;
use crate::error::{IdentityError, Result};
use crate::models::{NewSession, RefreshSession};

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn find_by_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshSession>> {
        let session = sqlx::query_as::<_, RefreshSession>(
            r#"
            SELECT id, user_id AS account_id, token_hash, expires_at,
                   is_revoked, revoked_at, created_at
            FROM refresh_tokens
            WHERE token_hash = $1 AND is_revoked = FALSE AND expires_at > $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IdentityError::Database(e.to_string()))?;

        Ok(session)
    }

    async fn rotate(
        &self,
        account_id: Uuid,
        consumed: Option<&str>,
        new: &NewSession,
    ) -> Result<RefreshSession> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Row lock on the owner serializes concurrent rotations per account
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| IdentityError::NotFound(format!("account {account_id}")))?;

        if let Some(consumed) = consumed {
            let revoked = sqlx::query(
                r#"
                UPDATE refresh_tokens
                SET is_revoked = TRUE, revoked_at = $1
                WHERE token_hash = $2 AND user_id = $3
                  AND is_revoked = FALSE AND expires_at > $1
                "#,
            )
            .bind(now)
            .bind(consumed)
            .bind(account_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if revoked == 0 {
                tx.rollback().await?;
                return Err(IdentityError::InvalidToken);
            }
        }

        let superseded = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, revoked_at = $1
            WHERE user_id = $2 AND is_revoked = FALSE
            "#,
        )
        .bind(now)
        .bind(account_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let session = sqlx::query_as::<_, RefreshSession>(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, is_revoked, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            RETURNING id, user_id AS account_id, token_hash, expires_at,
                      is_revoked, revoked_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.account_id)
        .bind(&new.token_hash)
        .bind(new.expires_at)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            account_id = %account_id,
            superseded,
            "Refresh session rotated"
        );
        Ok(session)
    }

    async fn revoke_by_token(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, revoked_at = $1
            WHERE token_hash = $2 AND is_revoked = FALSE
            "#,
        )
        .bind(Utc::now())
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| IdentityError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_by_account(&self, account_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, revoked_at = $1
            WHERE user_id = $2 AND is_revoked = FALSE
            "#,
        )
        .bind(Utc::now())
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(|e| IdentityError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE expires_at < $1 OR (is_revoked = TRUE AND revoked_at < $1)
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| IdentityError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
