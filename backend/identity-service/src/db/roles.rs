/// Role lookups. Roles are seeded by migration and read-only here.
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::RoleStore;
use crate::error::{IdentityError, Result};
use crate::models::Role;

#[derive(Clone)]
pub struct PgRoleStore {
    pool: PgPool,
}

impl PgRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, description, level, created_at, updated_at
            FROM roles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IdentityError::Database(e.to_string()))?;

        Ok(role)
    }

    async fn list(&self) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, description, level, created_at, updated_at
            FROM roles
            ORDER BY level ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IdentityError::Database(e.to_string()))?;

        Ok(roles)
    }
}
