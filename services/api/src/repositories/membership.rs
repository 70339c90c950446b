//! Membership repository for database operations

use common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::membership::{
    AddMemberOutcome, GroupMember, GroupRole, JoinOutcome, MemberEntry, Membership,
};

const MEMBERSHIP_COLUMNS: &str =
    "group_id, user_id, role, joined_at, role_updated_at, role_updated_by";

/// Membership repository
#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    /// Create a new membership repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Join a group as `member`
    ///
    /// Relies on the (group_id, user_id) primary key, so concurrent joins
    /// produce one row and every caller sees either `Joined` or
    /// `AlreadyMember`. Returns `None` when the group does not exist.
    pub async fn join(&self, group_id: Uuid, user_id: Uuid) -> DatabaseResult<Option<JoinOutcome>> {
        let inserted = sqlx::query_as::<_, Membership>(&format!(
            r#"
            INSERT INTO memberships (group_id, user_id, role)
            VALUES ($1, $2, 'member')
            ON CONFLICT (group_id, user_id) DO NOTHING
            RETURNING {MEMBERSHIP_COLUMNS}
            "#
        ))
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;

        let inserted = match inserted {
            Ok(row) => row,
            Err(e) => {
                let err = DatabaseError::from(e);
                if err.is_foreign_key_violation() {
                    return Ok(None);
                }
                return Err(err);
            }
        };

        if let Some(membership) = inserted {
            info!("User {} joined group {}", user_id, group_id);
            return Ok(Some(JoinOutcome::Joined(membership)));
        }

        let existing = self
            .find(group_id, user_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok(Some(JoinOutcome::AlreadyMember(existing)))
    }

    /// Remove a membership; false when there was none
    pub async fn leave(&self, group_id: Uuid, user_id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM memberships
            WHERE group_id = $1 AND user_id = $2
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find(&self, group_id: Uuid, user_id: Uuid) -> DatabaseResult<Option<Membership>> {
        let membership = sqlx::query_as::<_, Membership>(&format!(
            r#"
            SELECT {MEMBERSHIP_COLUMNS}
            FROM memberships
            WHERE group_id = $1 AND user_id = $2
            "#
        ))
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    /// Role of `user_id` in the group, `None` for non-members
    pub async fn get_role(&self, group_id: Uuid, user_id: Uuid) -> DatabaseResult<Option<GroupRole>> {
        let role = sqlx::query_scalar::<_, GroupRole>(
            r#"
            SELECT role
            FROM memberships
            WHERE group_id = $1 AND user_id = $2
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    /// Change a member's role, recording who changed it; `None` when the
    /// target is not a member
    pub async fn set_role(
        &self,
        group_id: Uuid,
        target_user_id: Uuid,
        role: GroupRole,
        actor_user_id: Uuid,
    ) -> DatabaseResult<Option<Membership>> {
        let membership = sqlx::query_as::<_, Membership>(&format!(
            r#"
            UPDATE memberships
            SET role = $3, role_updated_at = NOW(), role_updated_by = $4
            WHERE group_id = $1 AND user_id = $2
            RETURNING {MEMBERSHIP_COLUMNS}
            "#
        ))
        .bind(group_id)
        .bind(target_user_id)
        .bind(role)
        .bind(actor_user_id)
        .fetch_optional(&self.pool)
        .await?;

        if membership.is_some() {
            info!(
                "User {} set role of {} in group {} to {}",
                actor_user_id, target_user_id, group_id, role
            );
        }

        Ok(membership)
    }

    /// Look up or create a user by phone and join them to the group
    ///
    /// User provisioning and membership creation commit together or not at
    /// all. An existing user's username is refreshed.
    pub async fn add_member(
        &self,
        group_id: Uuid,
        username: &str,
        phone: &str,
    ) -> DatabaseResult<AddMemberOutcome> {
        let mut tx = self.pool.begin().await?;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (username, phone)
            VALUES ($1, $2)
            ON CONFLICT (phone) DO UPDATE SET username = EXCLUDED.username
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(phone)
        .fetch_one(&mut *tx)
        .await?;

        let added = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO memberships (group_id, user_id, role)
            VALUES ($1, $2, 'member')
            ON CONFLICT (group_id, user_id) DO NOTHING
            RETURNING user_id
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .is_some();

        let member = sqlx::query_as::<_, GroupMember>(
            r#"
            SELECT m.user_id, u.username, u.phone, m.role, m.joined_at
            FROM memberships m
            LEFT JOIN users u ON u.id = m.user_id
            WHERE m.group_id = $1 AND m.user_id = $2
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        if added {
            info!("Provisioned member {} into group {}", user_id, group_id);
            Ok(AddMemberOutcome::Added(member))
        } else {
            Ok(AddMemberOutcome::AlreadyMember(member))
        }
    }

    /// Members in join order
    pub async fn list_members(&self, group_id: Uuid) -> DatabaseResult<Vec<MemberEntry>> {
        let members = sqlx::query_as::<_, MemberEntry>(
            r#"
            SELECT m.user_id, u.username, m.joined_at
            FROM memberships m
            LEFT JOIN users u ON u.id = m.user_id
            WHERE m.group_id = $1
            ORDER BY m.joined_at ASC, m.user_id ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    /// Members with roles and phone numbers, in join order
    pub async fn list_members_with_roles(&self, group_id: Uuid) -> DatabaseResult<Vec<GroupMember>> {
        let members = sqlx::query_as::<_, GroupMember>(
            r#"
            SELECT m.user_id, u.username, u.phone, m.role, m.joined_at
            FROM memberships m
            LEFT JOIN users u ON u.id = m.user_id
            WHERE m.group_id = $1
            ORDER BY m.joined_at ASC, m.user_id ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }
}
