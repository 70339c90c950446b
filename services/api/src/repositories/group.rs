//! Group repository for database operations

use common::error::DatabaseResult;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::group::Group;
use crate::models::membership::GroupRole;

/// Group repository
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    /// Create a new group repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a group and make its creator the chairperson, atomically
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        created_by: Uuid,
    ) -> DatabaseResult<Group> {
        let mut tx = self.pool.begin().await?;

        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (name, description, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, created_by, created_at
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO memberships (group_id, user_id, role)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(group.id)
        .bind(created_by)
        .bind(GroupRole::Chairperson)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Created group {} for chairperson {}", group.id, created_by);
        Ok(group)
    }

    /// All groups, newest first
    pub async fn list(&self) -> DatabaseResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT id, name, description, created_by, created_at
            FROM groups
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            r#"
            SELECT id, name, description, created_by, created_at
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }
}
